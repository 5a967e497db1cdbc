//! 轨迹视频：帧类型、视频源、采样与缩略图

pub mod error;
pub mod frame;
pub mod sampler;
pub mod source;
pub mod thumbnail;

pub use error::DecodeError;
pub use frame::{PixelLayout, RasterImage, RawFrame};
pub use sampler::{get_frame, sample_indices, SampleSet};
pub use source::{
    ImageSequenceSource, ImageSequenceVideo, InMemoryVideo, OpenedVideo, VideoHandle, VideoSource,
};
pub use thumbnail::{encode_jpeg, thumbnail_size, THUMBNAIL_MAX_SIDE, THUMBNAIL_QUALITY};
