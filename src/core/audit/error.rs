use crate::core::policy::ScoringError;
use crate::core::video::DecodeError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("num_samples must be at least 1, got {0}")]
    InvalidSampleCount(usize),
    #[error("threshold must be finite, got {0}")]
    NonFiniteThreshold(f32),
    #[error("smoothing window must be at least 1, got {0}")]
    InvalidSmoothingWindow(usize),
    #[error("Config parse error: {0}")]
    Parse(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// 审核流程中失败的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStage {
    Configuration,
    OpenVideo,
    Sampling,
    Scoring,
    Aggregation,
}

impl AuditStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStage::Configuration => "configuration",
            AuditStage::OpenVideo => "open_video",
            AuditStage::Sampling => "sampling",
            AuditStage::Scoring => "scoring",
            AuditStage::Aggregation => "aggregation",
        }
    }
}

/// 终止一次审核运行的错误
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Invalid configuration: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Failed to open video: {0}")]
    OpenVideo(#[source] DecodeError),
    #[error("Scoring failed at frame {frame_index} after {frames_analyzed} analyzed frames: {source}")]
    Scoring {
        frame_index: usize,
        frames_analyzed: usize,
        #[source]
        source: ScoringError,
    },
    #[error("Invalid entropy {entropy} at frame {frame_index}")]
    InvalidEntropy { frame_index: usize, entropy: f32 },
    #[error("No frames could be scored ({frames_skipped} skipped)")]
    InsufficientData { frames_skipped: usize },
    #[error("Audit cancelled after {frames_analyzed} analyzed frames")]
    Cancelled { frames_analyzed: usize },
}

impl AuditError {
    pub fn stage(&self) -> AuditStage {
        match self {
            AuditError::Configuration(_) => AuditStage::Configuration,
            AuditError::OpenVideo(_) => AuditStage::OpenVideo,
            AuditError::Scoring { .. } => AuditStage::Scoring,
            AuditError::InvalidEntropy { .. } | AuditError::InsufficientData { .. } => {
                AuditStage::Aggregation
            }
            AuditError::Cancelled { .. } => AuditStage::Sampling,
        }
    }

    /// 失败前已成功打分的帧数
    pub fn frames_analyzed(&self) -> usize {
        match self {
            AuditError::Scoring {
                frames_analyzed, ..
            }
            | AuditError::Cancelled { frames_analyzed } => *frames_analyzed,
            _ => 0,
        }
    }
}
