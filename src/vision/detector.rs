// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Object detector capability consumed by the analysis pipeline

use anyhow::Result;
use std::path::Path;

/// One raw finding as emitted by a detector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
    /// Numeric class id
    pub class_id: u32,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    /// [x1, y1, x2, y2] in source image pixels
    pub bbox: [f32; 4],
}

/// Detector output for one image
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorOutput {
    /// Findings in emission order
    pub detections: Vec<RawDetection>,
    /// Source image width in pixels
    pub width: u32,
    /// Source image height in pixels
    pub height: u32,
}

/// A pretrained object detector
///
/// Implementations must be safe to share between threads. Backends whose
/// underlying runtime is not reentrant report `is_reentrant() == false`
/// and the pipeline serializes calls to them.
pub trait ObjectDetector: Send + Sync {
    /// Run detection on the image stored at `image_path`
    fn detect(&self, image_path: &Path) -> Result<DetectorOutput>;

    /// Model name for logs and health reporting
    fn name(&self) -> &str;

    /// Whether the model is loaded and ready for inference
    fn is_ready(&self) -> bool {
        true
    }

    /// Whether concurrent `detect` calls are safe without external locking
    fn is_reentrant(&self) -> bool {
        false
    }
}
