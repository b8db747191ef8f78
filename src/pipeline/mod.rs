// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Lung opacity analysis pipeline
//!
//! Turns an uploaded chest X-ray into normalized detections, optionally
//! bound to a patient with an audit hash and a templated explanation.

pub mod audit;
pub mod detector;
pub mod errors;
pub mod explanation;
pub mod ingest;
pub mod normalizer;
pub mod orchestrator;
pub mod patient;
pub mod types;

pub use audit::{compute_audit_hash, verify_audit_hash, AuditRecord};
pub use detector::DetectorService;
pub use errors::{sanitize_paths, PipelineError};
pub use explanation::{ExplanationGenerator, TemplateExplainer, NORMAL_STUDY_TEXT};
pub use ingest::{is_image_media_type, ImageAsset, Upload};
pub use normalizer::{DetectionNormalizer, LabelTable};
pub use orchestrator::{AnalysisPipeline, AnalyzeRequest, DEFAULT_MAX_UPLOAD_BYTES};
pub use patient::{Clock, FixedClock, PatientContext, PatientContextBinder, SystemClock};
pub use types::{
    AnalysisResult, Detection, ImageMetadata, ImageSize, PredictionResult, LUNG_OPACITY_LABEL,
};
