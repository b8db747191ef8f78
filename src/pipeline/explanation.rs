// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Clinical explanation generation
//!
//! `ExplanationGenerator` is the seam for explanation engines. The default
//! `TemplateExplainer` is rule-based and deterministic; a generative engine
//! can be injected into the pipeline without touching the orchestrator.

use super::types::Detection;

/// Text returned when nothing was detected
pub const NORMAL_STUDY_TEXT: &str = "No lung opacities detected. Chest X-ray appears normal.";

/// Produces a natural-language summary from a detection set
pub trait ExplanationGenerator: Send + Sync {
    fn explain(&self, detections: &[Detection]) -> String;

    /// Engine identifier for logs
    fn name(&self) -> &str;
}

/// Templated summary of the findings
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateExplainer;

impl TemplateExplainer {
    pub fn new() -> Self {
        Self
    }
}

impl ExplanationGenerator for TemplateExplainer {
    fn explain(&self, detections: &[Detection]) -> String {
        if detections.is_empty() {
            return NORMAL_STUDY_TEXT.to_string();
        }

        let count = detections.len();
        let average_confidence =
            detections.iter().map(|d| d.confidence).sum::<f64>() / count as f64;
        let noun = if count == 1 { "opacity" } else { "opacities" };

        format!(
            "Detected {} lung {} with average confidence of {:.1}%. \
             Findings suggest possible pneumonia or other pulmonary pathology. \
             Clinical correlation recommended.",
            count,
            noun,
            average_confidence * 100.0
        )
    }

    fn name(&self) -> &str {
        "template"
    }
}
