use super::frame::RasterImage;
use image::ImageOutputFormat;
use log::warn;
use std::io::Cursor;

pub const THUMBNAIL_MAX_SIDE: u32 = 320;
pub const THUMBNAIL_QUALITY: u8 = 70;

/// 最长边不超过 `max_side` 的等比尺寸
pub fn thumbnail_size(width: u32, height: u32, max_side: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_side {
        return (width, height);
    }
    let scale = max_side as f32 / longest as f32;
    let w = ((width as f32 * scale).round() as u32).max(1);
    let h = ((height as f32 * scale).round() as u32).max(1);
    (w, h)
}

/// 缩放到最长边不超过 `max_side` 后压缩为 JPEG，失败返回空数组
pub fn encode_jpeg(image: &RasterImage, max_side: u32, quality: u8) -> Vec<u8> {
    if !image.is_valid() || max_side == 0 {
        return vec![];
    }

    let (w, h) = thumbnail_size(image.width, image.height, max_side);
    let scaled = if (w, h) != (image.width, image.height) {
        image.resize_to(w, h)
    } else {
        Some(image.clone())
    };

    let Some(rgb) = scaled.and_then(|s| s.to_rgb_image()) else {
        return vec![];
    };

    let mut buffer = Cursor::new(Vec::new());
    match rgb.write_to(&mut buffer, ImageOutputFormat::Jpeg(quality)) {
        Ok(()) => buffer.into_inner(),
        Err(e) => {
            warn!("⚠️ JPEG encode failed for frame {}: {}", image.frame_index, e);
            vec![]
        }
    }
}
