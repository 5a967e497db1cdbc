use super::error::DecodeError;
use image::RgbImage;
use rayon::prelude::*;

/// 解码器原生像素排列
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    Rgb8,
    Rgba8,
    Bgr8,
    Bgra8,
}

impl PixelLayout {
    pub fn channels(&self) -> usize {
        match self {
            PixelLayout::Rgb8 | PixelLayout::Bgr8 => 3,
            PixelLayout::Rgba8 | PixelLayout::Bgra8 => 4,
        }
    }

    fn is_bgr(&self) -> bool {
        matches!(self, PixelLayout::Bgr8 | PixelLayout::Bgra8)
    }
}

/// 单帧 RGB 栅格图像（打分模型只接受 RGB）
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>, // RGB 格式
    pub frame_index: usize,
}

impl RasterImage {
    pub fn new(width: u32, height: u32, data: Vec<u8>, frame_index: usize) -> Self {
        Self {
            width,
            height,
            data,
            frame_index,
        }
    }

    /// 从解码器原生排列转换为 RGB，BGR 类排列在此处交换通道
    pub fn from_native(
        width: u32,
        height: u32,
        data: &[u8],
        layout: PixelLayout,
        frame_index: usize,
    ) -> Result<Self, DecodeError> {
        let channels = layout.channels();
        let expected = width as usize * height as usize * channels;
        if data.len() != expected {
            return Err(DecodeError::Corrupt {
                index: frame_index,
                reason: format!(
                    "buffer holds {} bytes, expected {} for {}x{} {:?}",
                    data.len(),
                    expected,
                    width,
                    height,
                    layout
                ),
            });
        }

        let mut rgb = vec![0u8; width as usize * height as usize * 3];
        let swap = layout.is_bgr();
        rgb.par_chunks_exact_mut(3)
            .zip(data.par_chunks_exact(channels))
            .for_each(|(dst, src)| {
                if swap {
                    dst[0] = src[2];
                    dst[1] = src[1];
                    dst[2] = src[0];
                } else {
                    dst.copy_from_slice(&src[..3]);
                }
            });

        Ok(Self::new(width, height, rgb, frame_index))
    }

    pub fn from_rgb_image(img: RgbImage, frame_index: usize) -> Self {
        let (width, height) = img.dimensions();
        Self::new(width, height, img.into_raw(), frame_index)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0 && self.data.len() == self.pixel_count() * 3
    }

    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
    }

    pub fn resize_to(&self, target_width: u32, target_height: u32) -> Option<RasterImage> {
        let img = self.to_rgb_image()?;
        let resized = image::imageops::resize(
            &img,
            target_width,
            target_height,
            image::imageops::FilterType::Triangle,
        );
        Some(RasterImage::from_rgb_image(resized, self.frame_index))
    }
}

/// 原生层传来的 YUV420 平面数据
#[derive(Debug)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub y_plane: Vec<u8>,
    pub u_plane: Vec<u8>,
    pub v_plane: Vec<u8>,
    pub frame_index: usize,
}

impl RawFrame {
    pub fn to_rgb(&self) -> Result<RasterImage, DecodeError> {
        let w = self.width as usize;
        let h = self.height as usize;
        let chroma_len = w.div_ceil(2) * h.div_ceil(2);
        if self.y_plane.len() < w * h
            || self.u_plane.len() < chroma_len
            || self.v_plane.len() < chroma_len
        {
            return Err(DecodeError::Corrupt {
                index: self.frame_index,
                reason: "YUV planes shorter than frame dimensions".to_string(),
            });
        }

        let chroma_w = w.div_ceil(2);
        let mut rgb_data = vec![0u8; w * h * 3];

        rgb_data
            .par_chunks_exact_mut(w * 3)
            .enumerate()
            .for_each(|(y, row)| {
                for x in 0..w {
                    let uv_idx = (y / 2) * chroma_w + x / 2;

                    let y_val = self.y_plane[y * w + x] as f32;
                    let u_val = self.u_plane[uv_idx] as f32 - 128.0;
                    let v_val = self.v_plane[uv_idx] as f32 - 128.0;

                    row[x * 3] = (y_val + 1.402 * v_val).clamp(0.0, 255.0) as u8;
                    row[x * 3 + 1] =
                        (y_val - 0.344136 * u_val - 0.714136 * v_val).clamp(0.0, 255.0) as u8;
                    row[x * 3 + 2] = (y_val + 1.772 * u_val).clamp(0.0, 255.0) as u8;
                }
            });

        Ok(RasterImage::new(
            self.width,
            self.height,
            rgb_data,
            self.frame_index,
        ))
    }
}
