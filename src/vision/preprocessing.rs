// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Letterbox preprocessing for the YOLO detector

use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use ndarray::Array4;

/// Default square input size for YOLOv8 exports
pub const YOLO_INPUT_SIZE: u32 = 640;

/// Gray value used to pad the letterbox
pub const LETTERBOX_FILL: u8 = 114;

/// Scale and padding applied during letterboxing
///
/// Used to map detector coordinates back to the source image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxInfo {
    /// Scale factor applied to the source image
    pub scale: f32,
    /// X offset from padding
    pub pad_x: f32,
    /// Y offset from padding
    pub pad_y: f32,
    /// Source image width
    pub original_width: u32,
    /// Source image height
    pub original_height: u32,
}

impl LetterboxInfo {
    /// Calculate letterbox geometry for a `width` x `height` source
    pub fn new(width: u32, height: u32, target_size: u32) -> Self {
        if width == 0 || height == 0 {
            return Self {
                scale: 1.0,
                pad_x: 0.0,
                pad_y: 0.0,
                original_width: width,
                original_height: height,
            };
        }

        let scale = (target_size as f32 / width as f32).min(target_size as f32 / height as f32);
        let (new_w, new_h) = scaled_dims(width, height, scale);

        Self {
            scale,
            pad_x: ((target_size - new_w) / 2) as f32,
            pad_y: ((target_size - new_h) / 2) as f32,
            original_width: width,
            original_height: height,
        }
    }

    /// Map a point from letterboxed space back to source pixels
    pub fn map_to_original(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

fn scaled_dims(width: u32, height: u32, scale: f32) -> (u32, u32) {
    let new_w = ((width as f32 * scale).round() as u32).max(1);
    let new_h = ((height as f32 * scale).round() as u32).max(1);
    (new_w, new_h)
}

/// Preprocess an image for YOLO inference
///
/// Steps:
/// 1. Resize with aspect ratio preservation to `target_size`
/// 2. Pad to square with gray (114), image centred
/// 3. Scale pixels to [0, 1]
/// 4. Convert to NCHW tensor format [1, 3, H, W]
pub fn preprocess_for_yolo(image: &DynamicImage, target_size: u32) -> (Array4<f32>, LetterboxInfo) {
    let (width, height) = image.dimensions();
    let info = LetterboxInfo::new(width, height, target_size);
    let canvas = letterbox(image, &info, target_size);

    let size = target_size as usize;
    let mut tensor = Array4::zeros((1, 3, size, size));

    for (x, y, pixel) in canvas.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }

    (tensor, info)
}

/// Resize into a padded square canvas according to `info`
pub fn letterbox(image: &DynamicImage, info: &LetterboxInfo, target_size: u32) -> RgbImage {
    let mut output = RgbImage::from_pixel(
        target_size,
        target_size,
        Rgb([LETTERBOX_FILL, LETTERBOX_FILL, LETTERBOX_FILL]),
    );

    if info.original_width == 0 || info.original_height == 0 {
        return output;
    }

    let (new_w, new_h) = scaled_dims(info.original_width, info.original_height, info.scale);
    let resized = image
        .resize_exact(new_w, new_h, image::imageops::FilterType::Triangle)
        .to_rgb8();

    image::imageops::replace(
        &mut output,
        &resized,
        info.pad_x as i64,
        info.pad_y as i64,
    );

    output
}
