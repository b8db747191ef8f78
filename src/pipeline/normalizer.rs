// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Maps raw detector output into the stable `Detection` schema

use std::collections::HashMap;
use tracing::warn;

use super::errors::PipelineError;
use super::types::{Detection, LUNG_OPACITY_LABEL};
use crate::vision::{DetectorOutput, RawDetection};

/// Decimal places kept for confidences
pub const CONFIDENCE_DECIMALS: i32 = 4;

/// Decimal places kept for bbox coordinates
pub const BBOX_DECIMALS: i32 = 2;

/// Class id to semantic label mapping, injected from configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
    labels: HashMap<u32, String>,
}

impl LabelTable {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (u32, S)>,
        S: Into<String>,
    {
        Self {
            labels: entries
                .into_iter()
                .map(|(id, label)| (id, label.into()))
                .collect(),
        }
    }

    /// Table where the position of each label is its class id
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Self {
        Self::new(
            labels
                .iter()
                .enumerate()
                .map(|(i, label)| (i as u32, label.as_ref().to_string())),
        )
    }

    pub fn label_for(&self, class_id: u32) -> Option<&str> {
        self.labels.get(&class_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl Default for LabelTable {
    fn default() -> Self {
        Self::new([(0, LUNG_OPACITY_LABEL)])
    }
}

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Pure transform from raw detections to the output schema
///
/// Emission order is preserved; no confidence sorting happens here.
#[derive(Debug, Clone, Default)]
pub struct DetectionNormalizer {
    labels: LabelTable,
}

impl DetectionNormalizer {
    pub fn new(labels: LabelTable) -> Self {
        Self { labels }
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub fn normalize(&self, output: &DetectorOutput) -> Result<Vec<Detection>, PipelineError> {
        output
            .detections
            .iter()
            .map(|raw| self.normalize_one(raw, output.width, output.height))
            .collect()
    }

    fn normalize_one(
        &self,
        raw: &RawDetection,
        width: u32,
        height: u32,
    ) -> Result<Detection, PipelineError> {
        let label = self.labels.label_for(raw.class_id).ok_or_else(|| {
            PipelineError::Internal(format!(
                "detector emitted class id {} which has no configured label",
                raw.class_id
            ))
        })?;

        if !raw.confidence.is_finite() || raw.bbox.iter().any(|v| !v.is_finite()) {
            return Err(PipelineError::Internal(
                "detector emitted a non-finite value".to_string(),
            ));
        }

        let confidence = f64::from(raw.confidence);
        if !(0.0..=1.0).contains(&confidence) {
            warn!("Clamping out-of-range confidence {:.6}", confidence);
        }
        let confidence = round_to(confidence.clamp(0.0, 1.0), CONFIDENCE_DECIMALS);

        let (w, h) = (f64::from(width), f64::from(height));
        let [ax, ay, bx, by] = raw.bbox.map(f64::from);
        let x1 = ax.min(bx).clamp(0.0, w);
        let x2 = ax.max(bx).clamp(0.0, w);
        let y1 = ay.min(by).clamp(0.0, h);
        let y2 = ay.max(by).clamp(0.0, h);

        Ok(Detection {
            label: label.to_string(),
            confidence,
            bbox: [x1, y1, x2, y2].map(|v| round_to(v, BBOX_DECIMALS)),
        })
    }
}
