//! 阶段感知聚合
//!
//! 轨迹开头（伸手接近物体）和结尾（松开、收回）模型本来就不确定，
//! 与指令好坏无关。判定只看中间 60% 的"动作区"，峰值仅作诊断。

use super::error::AuditError;
use super::profile::{EntropyProfile, FrameScore};
use serde::Serialize;
use std::ops::Range;

pub const TOP_K: usize = 3;

const ZONE_START_TENTHS: usize = 2;
const ZONE_END_TENTHS: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneSummary {
    pub action_zone_average: f32,
    pub overall_peak: f32,
    /// 熵降序，同分时帧号小的在前
    pub top_k_frames: Vec<FrameScore>,
    #[serde(skip)]
    pub zone: Range<usize>,
}

/// 动作区在曲线中的位置范围 `[floor(0.2n), floor(0.8n))`
///
/// 范围为空时（n 很小）退化为整条曲线。
pub fn action_zone(len: usize) -> Range<usize> {
    let start = len * ZONE_START_TENTHS / 10;
    let end = len * ZONE_END_TENTHS / 10;
    if end <= start {
        0..len
    } else {
        start..end
    }
}

pub fn aggregate(profile: &EntropyProfile) -> Result<ZoneSummary, AuditError> {
    let scores = profile.scores();
    if scores.is_empty() {
        return Err(AuditError::InsufficientData { frames_skipped: 0 });
    }

    let zone = action_zone(scores.len());
    let zone_scores = &scores[zone.clone()];
    let action_zone_average =
        zone_scores.iter().map(|s| s.entropy as f64).sum::<f64>() / zone_scores.len() as f64;

    let overall_peak = scores
        .iter()
        .map(|s| s.entropy)
        .fold(f32::NEG_INFINITY, f32::max);

    let action_zone_average = action_zone_average as f32;
    // 均值不超过峰值；全等时舍入误差可能越界，只在两者都有限时修正
    let action_zone_average = if action_zone_average.is_finite() && overall_peak.is_finite() {
        action_zone_average.min(overall_peak)
    } else {
        action_zone_average
    };

    Ok(ZoneSummary {
        action_zone_average,
        overall_peak,
        top_k_frames: top_k(scores, TOP_K),
        zone,
    })
}

fn top_k(scores: &[FrameScore], k: usize) -> Vec<FrameScore> {
    let mut ranked = scores.to_vec();
    ranked.sort_by(|a, b| {
        b.entropy
            .total_cmp(&a.entropy)
            .then(a.frame_index.cmp(&b.frame_index))
    });
    ranked.truncate(k);
    ranked
}
