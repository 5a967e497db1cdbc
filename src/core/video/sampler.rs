//! 帧采样器 - 在整段视频上均匀取样

use super::error::DecodeError;
use super::frame::RasterImage;
use super::source::OpenedVideo;
use log::debug;

/// 严格递增的帧索引序列，创建后不可变
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleSet {
    indices: Vec<usize>,
}

impl SampleSet {
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }
}

/// 在 `[0, total_frames - 1]` 上线性插值取 `num_samples` 个索引（向下取整）
///
/// 首尾两帧总会被采到；`num_samples > total_frames` 时重复索引被合并，
/// 结果长度为 `min(num_samples, total_frames)`。任一参数为 0 时返回空集。
pub fn sample_indices(total_frames: usize, num_samples: usize) -> SampleSet {
    if total_frames == 0 || num_samples == 0 {
        return SampleSet { indices: vec![] };
    }
    if num_samples == 1 {
        return SampleSet { indices: vec![0] };
    }

    let last = total_frames - 1;
    let steps = num_samples - 1;
    let mut indices: Vec<usize> = (0..num_samples)
        .map(|i| ((i as u128 * last as u128) / steps as u128) as usize)
        .collect();
    indices.dedup();

    debug!(
        "🎯 Sampled {} of {} frames (requested {})",
        indices.len(),
        total_frames,
        num_samples
    );
    SampleSet { indices }
}

/// 定位并解码一帧
pub fn get_frame(video: &mut OpenedVideo, index: usize) -> Result<RasterImage, DecodeError> {
    let total = video.total_frame_count();
    if index >= total {
        return Err(DecodeError::OutOfRange { index, total });
    }
    video.read_frame(index)
}
