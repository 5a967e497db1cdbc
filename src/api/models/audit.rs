use crate::core::audit::{
    action_zone, AuditError, AuditReport, AuditResult, AuditStage, FrameScore, Verdict,
};
use crate::core::video::{
    encode_jpeg, thumbnail_size, RasterImage, THUMBNAIL_MAX_SIDE, THUMBNAIL_QUALITY,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditVerdict {
    /// 指令清晰，轨迹可用
    Pass,
    /// 动作区不确定性过高，需要人工复核
    Reject,
}

impl From<Verdict> for AuditVerdict {
    fn from(v: Verdict) -> Self {
        match v {
            Verdict::Pass => AuditVerdict::Pass,
            Verdict::Reject => AuditVerdict::Reject,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameEntropy {
    pub frame_index: u32,
    pub entropy: f32,
}

impl From<&FrameScore> for FrameEntropy {
    fn from(s: &FrameScore) -> Self {
        Self {
            frame_index: s.frame_index as u32,
            entropy: s.entropy,
        }
    }
}

/// 最不确定的帧及其缩略图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopFrameInfo {
    pub frame_index: u32,
    pub entropy: f32,
    pub jpeg_data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// 仅由熵曲线得出的判定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileVerdict {
    pub verdict: AuditVerdict,
    pub action_zone_average: f32,
    pub overall_peak: f32,
    pub threshold: f32,
    pub top_frames: Vec<FrameEntropy>,
    /// 动作区在曲线中的位置 `[zone_start, zone_end)`
    pub zone_start: u32,
    pub zone_end: u32,
}

impl ProfileVerdict {
    pub(crate) fn from_result(result: &AuditResult, profile_len: usize, threshold: f32) -> Self {
        let zone = action_zone(profile_len);
        Self {
            verdict: result.verdict.into(),
            action_zone_average: result.action_zone_average,
            overall_peak: result.overall_peak,
            threshold,
            top_frames: result.top_k_frames.iter().map(FrameEntropy::from).collect(),
            zone_start: zone.start as u32,
            zone_end: zone.end as u32,
        }
    }
}

/// 一次完整审核的展示数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSummary {
    pub verdict: ProfileVerdict,
    pub profile: Vec<FrameEntropy>,
    pub smoothed: Vec<f32>,
    pub top_frames: Vec<TopFrameInfo>,
    pub frames_analyzed: u32,
    /// 跳过的帧会降低动作区均值的可信度
    pub frames_skipped: u32,
    pub planned_samples: u32,
    pub total_frames: u32,
    pub stopped_early: bool,
}

impl AuditSummary {
    pub(crate) fn from_report(report: &AuditReport, threshold: f32) -> Self {
        let top_frames = report
            .top_frame_images
            .iter()
            .filter_map(|image| {
                let score = report
                    .result
                    .top_k_frames
                    .iter()
                    .find(|s| s.frame_index == image.frame_index)?;
                Some(top_frame_info(score, image))
            })
            .collect();

        Self {
            verdict: ProfileVerdict::from_result(&report.result, report.profile.len(), threshold),
            profile: report.profile.scores().iter().map(FrameEntropy::from).collect(),
            smoothed: report.smoothed.clone(),
            top_frames,
            frames_analyzed: report.frames_analyzed() as u32,
            frames_skipped: report.frames_skipped() as u32,
            planned_samples: report.planned_samples as u32,
            total_frames: report.total_frames as u32,
            stopped_early: report.stopped_early_at.is_some(),
        }
    }
}

fn top_frame_info(score: &FrameScore, image: &RasterImage) -> TopFrameInfo {
    let jpeg_data = encode_jpeg(image, THUMBNAIL_MAX_SIDE, THUMBNAIL_QUALITY);
    let (width, height) = if jpeg_data.is_empty() {
        (0, 0)
    } else {
        thumbnail_size(image.width, image.height, THUMBNAIL_MAX_SIDE)
    };
    TopFrameInfo {
        frame_index: score.frame_index as u32,
        entropy: score.entropy,
        jpeg_data,
        width,
        height,
    }
}

/// 审核 API 错误，FRB 友好的扁平结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditApiError {
    pub error_type: String,
    /// 失败阶段
    pub stage: String,
    pub frames_analyzed: u32,
    pub message: String,
}

impl AuditApiError {
    pub(crate) fn model_poisoned() -> Self {
        Self {
            error_type: "ModelUnavailable".to_string(),
            stage: AuditStage::Scoring.as_str().to_string(),
            frames_analyzed: 0,
            message: "policy model lock poisoned by a previous panic".to_string(),
        }
    }
}

impl From<AuditError> for AuditApiError {
    fn from(e: AuditError) -> Self {
        let error_type = match &e {
            AuditError::Configuration(_) => "ConfigurationError",
            AuditError::OpenVideo(_) => "DecodeError",
            AuditError::Scoring { .. } => "ScoringError",
            AuditError::InvalidEntropy { .. } => "InvalidInputError",
            AuditError::InsufficientData { .. } => "InsufficientDataError",
            AuditError::Cancelled { .. } => "Cancelled",
        };
        Self {
            error_type: error_type.to_string(),
            stage: e.stage().as_str().to_string(),
            frames_analyzed: e.frames_analyzed() as u32,
            message: e.to_string(),
        }
    }
}

impl std::fmt::Display for AuditApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}@{}] {} ({} frames analyzed)",
            self.error_type, self.stage, self.message, self.frames_analyzed
        )
    }
}

impl std::error::Error for AuditApiError {}
