use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("Policy model unavailable: {0}")]
    Unavailable(String),
    #[error("Malformed input for frame {frame_index}: {reason}")]
    MalformedInput { frame_index: usize, reason: String },
    #[error("Invalid action distribution: {0}")]
    InvalidDistribution(String),
}

impl ScoringError {
    /// 单帧问题可跳过；模型不可用时继续跑没有意义
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ScoringError::Unavailable(_))
    }
}
