//! 轨迹熵曲线：逐个采样帧取帧、打分

use super::config::ScoringErrorPolicy;
use super::error::AuditError;
use super::progress::{AuditObserver, AuditProgress, NoProgress};
use crate::core::policy::{PolicyModel, UncertaintyScorer};
use crate::core::video::{get_frame, OpenedVideo, SampleSet};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameScore {
    pub frame_index: usize,
    pub entropy: f32,
}

impl FrameScore {
    /// 熵必须有限且非负
    pub fn is_valid(&self) -> bool {
        self.entropy.is_finite() && self.entropy >= 0.0
    }
}

/// 按采样顺序排列的帧得分，frame_index 严格递增
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EntropyProfile {
    scores: Vec<FrameScore>,
}

impl EntropyProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从现成的得分构建，frame_index 不严格递增或熵非法时返回 None
    pub fn from_scores(scores: Vec<FrameScore>) -> Option<Self> {
        let ordered = scores.windows(2).all(|w| w[0].frame_index < w[1].frame_index);
        if ordered && scores.iter().all(FrameScore::is_valid) {
            Some(Self { scores })
        } else {
            None
        }
    }

    /// 以 0, 1, 2... 作为帧号构建，拒绝 NaN、无穷和负熵
    pub fn from_entropies(entropies: &[f32]) -> Result<Self, AuditError> {
        let scores = entropies
            .iter()
            .enumerate()
            .map(|(frame_index, &entropy)| {
                let score = FrameScore {
                    frame_index,
                    entropy,
                };
                if score.is_valid() {
                    Ok(score)
                } else {
                    Err(AuditError::InvalidEntropy {
                        frame_index,
                        entropy,
                    })
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { scores })
    }

    /// 追加一帧；破坏递增顺序或熵非法时拒绝并返回 false
    pub fn push(&mut self, score: FrameScore) -> bool {
        if !score.is_valid() {
            return false;
        }
        if let Some(last) = self.scores.last() {
            if score.frame_index <= last.frame_index {
                return false;
            }
        }
        self.scores.push(score);
        true
    }

    pub fn scores(&self) -> &[FrameScore] {
        &self.scores
    }

    pub fn entropies(&self) -> Vec<f32> {
        self.scores.iter().map(|s| s.entropy).collect()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// 一次取样打分的结果
#[derive(Debug, Clone)]
pub struct ProfileOutcome {
    pub profile: EntropyProfile,
    /// 打分失败但按策略跳过的帧
    pub skipped_frames: Vec<usize>,
    /// 第一个无法解码的采样帧，之后的采样被放弃
    pub stopped_early_at: Option<usize>,
    pub planned_samples: usize,
}

/// 不带进度回调、使用默认错误策略的简化入口
pub fn build_profile(
    video: &mut OpenedVideo,
    sample_set: &SampleSet,
    model: &mut dyn PolicyModel,
    instruction: &str,
) -> Result<ProfileOutcome, AuditError> {
    build_profile_with(
        video,
        sample_set,
        model,
        instruction,
        ScoringErrorPolicy::default(),
        &mut NoProgress,
    )
}

/// 按采样顺序取帧、打分
///
/// 解码失败时停止并返回已得到的部分曲线；打分失败按 `policy` 跳过或终止。
pub fn build_profile_with(
    video: &mut OpenedVideo,
    sample_set: &SampleSet,
    model: &mut dyn PolicyModel,
    instruction: &str,
    policy: ScoringErrorPolicy,
    observer: &mut dyn AuditObserver,
) -> Result<ProfileOutcome, AuditError> {
    let planned = sample_set.len();
    let mut profile = EntropyProfile::new();
    let mut skipped_frames = Vec::new();
    let mut stopped_early_at = None;

    for (i, frame_index) in sample_set.iter().enumerate() {
        let position = i + 1;

        let image = match get_frame(video, frame_index) {
            Ok(image) => image,
            Err(e) => {
                warn!(
                    "⚠️ Decode failed at frame {} ({}), stopping with {} scored frames",
                    frame_index,
                    e,
                    profile.len()
                );
                stopped_early_at = Some(frame_index);
                // 已经停止，忽略取消请求
                let _ = observer.on_progress(AuditProgress::StoppedEarly {
                    frame_index,
                    frames_analyzed: profile.len(),
                });
                break;
            }
        };

        checkpoint(
            observer,
            AuditProgress::FrameFetched {
                frame_index,
                position,
                planned,
            },
            profile.len(),
        )?;

        let event = match UncertaintyScorer::score(model, &image, instruction) {
            Ok(entropy) => {
                profile.push(FrameScore {
                    frame_index,
                    entropy,
                });
                AuditProgress::FrameScored {
                    frame_index,
                    entropy,
                    position,
                    planned,
                }
            }
            Err(e) if policy.should_skip(e.is_recoverable()) => {
                warn!("⚠️ Skipping frame {}: {}", frame_index, e);
                skipped_frames.push(frame_index);
                AuditProgress::FrameSkipped {
                    frame_index,
                    position,
                    planned,
                }
            }
            Err(e) => {
                return Err(AuditError::Scoring {
                    frame_index,
                    frames_analyzed: profile.len(),
                    source: e,
                });
            }
        };

        checkpoint(observer, event, profile.len())?;
    }

    debug!(
        "📈 Profile built: {} scored, {} skipped, {} planned",
        profile.len(),
        skipped_frames.len(),
        planned
    );

    Ok(ProfileOutcome {
        profile,
        skipped_frames,
        stopped_early_at,
        planned_samples: planned,
    })
}

fn checkpoint(
    observer: &mut dyn AuditObserver,
    event: AuditProgress,
    frames_analyzed: usize,
) -> Result<(), AuditError> {
    match observer.on_progress(event) {
        ControlFlow::Continue(()) => Ok(()),
        ControlFlow::Break(()) => Err(AuditError::Cancelled { frames_analyzed }),
    }
}

/// 居中滑动平均，仅用于展示
///
/// 窗口覆盖 `[i - window/2, i - window/2 + window)`；边界处凑不满窗口时使用原值。
pub fn smooth(profile: &EntropyProfile, window: usize) -> Vec<f32> {
    let values = profile.entropies();
    let n = values.len();
    if window <= 1 || window > n {
        return values;
    }

    let half = window / 2;
    (0..n)
        .map(|i| {
            if i < half || i - half + window > n {
                return values[i];
            }
            let start = i - half;
            let sum: f32 = values[start..start + window].iter().sum();
            sum / window as f32
        })
        .collect()
}
