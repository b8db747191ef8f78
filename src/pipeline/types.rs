// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Data model shared by the pipeline stages and the HTTP surface

use serde::{Deserialize, Serialize};

use super::audit::AuditRecord;

/// Label emitted by the single-class lung opacity model
pub const LUNG_OPACITY_LABEL: &str = "lung_opacity";

/// One normalized finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Semantic class label
    pub label: String,
    /// Confidence in [0, 1], rounded to 4 decimal places
    pub confidence: f64,
    /// [x1, y1, x2, y2] in source pixels, rounded to 2 decimal places
    pub bbox: [f64; 4],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub filename: String,
    pub image_size: ImageSize,
}

impl ImageMetadata {
    pub fn new(filename: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            filename: filename.into(),
            image_size: ImageSize { width, height },
        }
    }
}

/// Result of the full analysis flow
///
/// `patient_metadata`, `timestamp` and `audit_hash` travel together inside
/// `audit`; when no patient context was supplied none of the three keys is
/// serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    /// Detector emission order, never re-sorted
    pub detections: Vec<Detection>,
    pub image_metadata: ImageMetadata,
    #[serde(flatten)]
    pub audit: Option<AuditRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clinical_explanation: Option<String>,
}

/// Result of the minimal prediction flow: detections and image metadata only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub detections: Vec<Detection>,
    pub image_metadata: ImageMetadata,
}
