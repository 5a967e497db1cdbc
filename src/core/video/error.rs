use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Failed to open video: {0}")]
    Open(String),
    #[error("Frame {index} out of range (total {total})")]
    OutOfRange { index: usize, total: usize },
    #[error("Frame {index} could not be decoded: {reason}")]
    Corrupt { index: usize, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}
