//! 视频源抽象
//!
//! 容器解码不在本库范围内：调用方只需提供一个可随机定位、帧数已知的帧序列。
//! 本库自带两种实现：
//! - [`ImageSequenceVideo`] - 目录下按文件名排序的静态图片序列
//! - [`InMemoryVideo`] - 内存帧序列，可声明比实际更多的帧数（用于测试元数据不一致）

use super::error::DecodeError;
use super::frame::RasterImage;
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// 已打开的视频句柄
pub trait VideoHandle: Send {
    /// 元数据声明的总帧数（实际可解码的帧可能更少）
    fn total_frame_count(&self) -> usize;

    /// 定位并解码一帧，返回 RGB 图像
    fn read_frame(&mut self, index: usize) -> Result<RasterImage, DecodeError>;

    /// 释放底层资源。`OpenedVideo` 保证每条退出路径都会调用一次
    fn release(&mut self) {}
}

pub trait VideoSource {
    fn open(&self, path: &Path) -> Result<Box<dyn VideoHandle>, DecodeError>;
}

/// 作用域内持有的视频句柄，离开作用域时释放
pub struct OpenedVideo {
    handle: Box<dyn VideoHandle>,
}

impl OpenedVideo {
    pub fn new(handle: Box<dyn VideoHandle>) -> Self {
        info!(
            "🎬 OpenedVideo: acquired ({} frames reported)",
            handle.total_frame_count()
        );
        Self { handle }
    }

    pub fn open(source: &dyn VideoSource, path: &Path) -> Result<Self, DecodeError> {
        Ok(Self::new(source.open(path)?))
    }

    pub fn total_frame_count(&self) -> usize {
        self.handle.total_frame_count()
    }

    pub fn read_frame(&mut self, index: usize) -> Result<RasterImage, DecodeError> {
        self.handle.read_frame(index)
    }
}

impl Drop for OpenedVideo {
    fn drop(&mut self) {
        self.handle.release();
        info!("🗑️ OpenedVideo: released");
    }
}

/// 图片序列视频：目录中每个图片文件为一帧，按文件名排序
pub struct ImageSequenceVideo {
    frames: Vec<PathBuf>,
}

impl ImageSequenceVideo {
    pub fn open_dir(dir: &Path) -> Result<Self, DecodeError> {
        if !dir.is_dir() {
            return Err(DecodeError::Open(format!(
                "{:?} is not a directory",
                dir
            )));
        }

        let mut frames: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && Self::is_image(p))
            .collect();
        frames.sort();

        if frames.is_empty() {
            return Err(DecodeError::Open(format!("no image frames in {:?}", dir)));
        }

        debug!("📂 Image sequence {:?}: {} frames", dir, frames.len());
        Ok(Self { frames })
    }

    fn is_image(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }
}

impl VideoHandle for ImageSequenceVideo {
    fn total_frame_count(&self) -> usize {
        self.frames.len()
    }

    fn read_frame(&mut self, index: usize) -> Result<RasterImage, DecodeError> {
        let path = self.frames.get(index).ok_or(DecodeError::OutOfRange {
            index,
            total: self.frames.len(),
        })?;

        let img = image::open(path).map_err(|e| DecodeError::Corrupt {
            index,
            reason: format!("{:?}: {}", path, e),
        })?;

        Ok(RasterImage::from_rgb_image(img.to_rgb8(), index))
    }

    fn release(&mut self) {
        self.frames.clear();
    }
}

/// 打开图片序列目录的视频源
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageSequenceSource;

impl VideoSource for ImageSequenceSource {
    fn open(&self, path: &Path) -> Result<Box<dyn VideoHandle>, DecodeError> {
        Ok(Box::new(ImageSequenceVideo::open_dir(path)?))
    }
}

/// 内存帧序列
pub struct InMemoryVideo {
    frames: Vec<RasterImage>,
    reported_frames: usize,
    released: Arc<AtomicBool>,
    reads: Arc<AtomicUsize>,
}

impl InMemoryVideo {
    pub fn new(frames: Vec<RasterImage>) -> Self {
        let reported_frames = frames.len();
        Self::with_reported_frames(frames, reported_frames)
    }

    /// 元数据声明 `reported_frames` 帧，但只有 `frames` 可解码
    pub fn with_reported_frames(frames: Vec<RasterImage>, reported_frames: usize) -> Self {
        Self {
            frames,
            reported_frames,
            released: Arc::new(AtomicBool::new(false)),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// 生成 `count` 帧纯色小图，帧号即像素值（取模 256）
    pub fn solid(count: usize, width: u32, height: u32) -> Self {
        let frames = (0..count)
            .map(|i| {
                let fill = (i % 256) as u8;
                let len = width as usize * height as usize * 3;
                RasterImage::new(width, height, vec![fill; len], i)
            })
            .collect();
        Self::new(frames)
    }

    pub fn release_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.released)
    }

    pub fn read_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.reads)
    }
}

impl VideoHandle for InMemoryVideo {
    fn total_frame_count(&self) -> usize {
        self.reported_frames
    }

    fn read_frame(&mut self, index: usize) -> Result<RasterImage, DecodeError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if index >= self.reported_frames {
            return Err(DecodeError::OutOfRange {
                index,
                total: self.reported_frames,
            });
        }
        self.frames
            .get(index)
            .cloned()
            .ok_or_else(|| DecodeError::Corrupt {
                index,
                reason: "frame missing from stream".to_string(),
            })
    }

    fn release(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}
