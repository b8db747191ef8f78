// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Annotated copy of the analyzed X-ray
//!
//! Each detection gets a box outline and, above it, a confidence bar whose
//! length is the confidence fraction of the box width. Numbered in the same
//! order as the text report.

use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use std::path::Path;

use crate::pipeline::Detection;

/// Outline color
pub const BOX_COLOR: Rgb<u8> = Rgb([255, 64, 64]);

/// Outline thickness in pixels
pub const BOX_THICKNESS: u32 = 3;

/// Height of the confidence bar in pixels
pub const BAR_HEIGHT: u32 = 6;

/// Draw every detection onto an RGB copy of `image`
pub fn annotate_detections(image: &DynamicImage, detections: &[Detection]) -> RgbImage {
    let mut canvas = image.to_rgb8();
    let (width, height) = canvas.dimensions();

    for det in detections {
        let [x1, y1, x2, y2] = det.bbox;
        let left = x1.clamp(0.0, f64::from(width)).floor() as i32;
        let top = y1.clamp(0.0, f64::from(height)).floor() as i32;
        let box_w = ((x2 - x1).round() as u32).max(1);
        let box_h = ((y2 - y1).round() as u32).max(1);

        for t in 0..BOX_THICKNESS {
            if box_w <= 2 * t || box_h <= 2 * t {
                break;
            }
            let rect = Rect::at(left + t as i32, top + t as i32)
                .of_size(box_w - 2 * t, box_h - 2 * t);
            draw_hollow_rect_mut(&mut canvas, rect, BOX_COLOR);
        }

        let bar_w = ((f64::from(box_w) * det.confidence).round() as u32).max(1);
        // no room above the box: draw the bar just inside its top edge
        let bar_top = if top >= BAR_HEIGHT as i32 {
            top - BAR_HEIGHT as i32
        } else {
            top + BOX_THICKNESS as i32
        };
        draw_filled_rect_mut(
            &mut canvas,
            Rect::at(left, bar_top).of_size(bar_w, BAR_HEIGHT),
            BOX_COLOR,
        );
    }

    canvas
}

/// Write the annotated image as JPEG
pub fn save_annotated(
    image: &DynamicImage,
    detections: &[Detection],
    path: &Path,
) -> Result<()> {
    annotate_detections(image, detections)
        .save_with_format(path, ImageFormat::Jpeg)
        .with_context(|| format!("Failed to write annotated image {}", path.display()))
}
