// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Composes the pipeline stages into the analysis and prediction flows
//!
//! Full analysis:
//! validate → ingest → detect → normalize → bind → hash → explain
//!
//! Minimal prediction:
//! validate → ingest → detect → normalize
//!
//! Staged storage is released as soon as the detector returns, on the
//! blocking thread that ran it, so a cancelled request still cleans up.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::audit::AuditRecord;
use super::detector::DetectorService;
use super::errors::PipelineError;
use super::explanation::{ExplanationGenerator, TemplateExplainer};
use super::ingest::{ImageAsset, Upload};
use super::normalizer::DetectionNormalizer;
use super::patient::{Clock, PatientContext, PatientContextBinder};
use super::types::{AnalysisResult, Detection, ImageMetadata, PredictionResult};
use crate::vision::DetectorOutput;

/// Default upload limit (10 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Input to the full analysis flow
#[derive(Debug, Clone)]
pub struct AnalyzeRequest {
    pub upload: Upload,
    pub patient: Option<PatientContext>,
    pub include_explanation: bool,
}

impl AnalyzeRequest {
    pub fn new(upload: Upload) -> Self {
        Self {
            upload,
            patient: None,
            include_explanation: true,
        }
    }

    pub fn with_patient(mut self, patient: PatientContext) -> Self {
        self.patient = Some(patient);
        self
    }

    pub fn with_explanation(mut self, include_explanation: bool) -> Self {
        self.include_explanation = include_explanation;
        self
    }
}

/// The analysis pipeline, shared by all requests
#[derive(Clone)]
pub struct AnalysisPipeline {
    detector: DetectorService,
    normalizer: DetectionNormalizer,
    binder: PatientContextBinder,
    explainer: Arc<dyn ExplanationGenerator>,
    max_upload_bytes: usize,
}

impl std::fmt::Debug for AnalysisPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisPipeline")
            .field("detector", &self.detector)
            .field("normalizer", &self.normalizer)
            .field("explainer", &self.explainer.name())
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

impl AnalysisPipeline {
    pub fn new(detector: DetectorService, normalizer: DetectionNormalizer) -> Self {
        Self {
            detector,
            normalizer,
            binder: PatientContextBinder::default(),
            explainer: Arc::new(TemplateExplainer::new()),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_explainer(mut self, explainer: Arc<dyn ExplanationGenerator>) -> Self {
        self.explainer = explainer;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.binder = PatientContextBinder::new(clock);
        self
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    pub fn detector(&self) -> &DetectorService {
        &self.detector
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Full analysis with optional patient binding and explanation
    pub async fn analyze(&self, request: AnalyzeRequest) -> Result<AnalysisResult, PipelineError> {
        let request_id = Uuid::new_v4();
        let started = Instant::now();
        let patient_tag = request
            .patient
            .as_ref()
            .map(PatientContext::masked_id)
            .unwrap_or_else(|| "-".to_string());

        info!(
            "[{}] Analysis started (patient {}, explanation {})",
            request_id, patient_tag, request.include_explanation
        );

        let (output, filename) = self.detect_upload(request_id, request.upload).await?;
        let detections = self.normalize(request_id, &output)?;

        let audit = self
            .binder
            .bind(request.patient)
            .map(|binding| AuditRecord::seal(binding, detections.len()));
        if let Some(record) = &audit {
            debug!(
                "[{}] Bound patient {} at {}",
                request_id,
                record.patient_metadata.masked_id(),
                record.timestamp
            );
        }

        let clinical_explanation = if request.include_explanation {
            let text = self.explainer.explain(&detections);
            debug!("[{}] Explanation from {}", request_id, self.explainer.name());
            Some(text)
        } else {
            None
        };

        info!(
            "[{}] Analysis complete: {} detections, {}ms",
            request_id,
            detections.len(),
            started.elapsed().as_millis()
        );

        Ok(AnalysisResult {
            detections,
            image_metadata: ImageMetadata::new(filename, output.width, output.height),
            audit,
            clinical_explanation,
        })
    }

    /// Detections and image metadata only
    pub async fn predict(&self, upload: Upload) -> Result<PredictionResult, PipelineError> {
        let request_id = Uuid::new_v4();
        let started = Instant::now();
        info!("[{}] Prediction started", request_id);

        let (output, filename) = self.detect_upload(request_id, upload).await?;
        let detections = self.normalize(request_id, &output)?;

        info!(
            "[{}] Prediction complete: {} detections, {}ms",
            request_id,
            detections.len(),
            started.elapsed().as_millis()
        );

        Ok(PredictionResult {
            detections,
            image_metadata: ImageMetadata::new(filename, output.width, output.height),
        })
    }

    /// Validate, stage and detect; the staged file never outlives this call
    async fn detect_upload(
        &self,
        request_id: Uuid,
        upload: Upload,
    ) -> Result<(DetectorOutput, String), PipelineError> {
        if let Err(e) = upload.validate(self.max_upload_bytes) {
            warn!("[{}] Upload rejected: {}", request_id, e);
            return Err(e);
        }

        let detector = self.detector.clone();
        let max_upload_bytes = self.max_upload_bytes;
        let started = Instant::now();

        let result = tokio::task::spawn_blocking(move || {
            let asset = ImageAsset::ingest(upload, max_upload_bytes)?;
            let filename = asset.filename().to_string();
            let output = detector.detect(&asset);
            asset.release();
            output.map(|output| (output, filename))
        })
        .await
        .map_err(|e| {
            if e.is_panic() {
                PipelineError::DetectorFailure("detector panicked".to_string())
            } else {
                PipelineError::DetectorFailure("detection task was cancelled".to_string())
            }
        })
        .and_then(|result| result);

        match &result {
            Ok((output, _)) => debug!(
                "[{}] Detector returned {} raw detections on {}x{} in {}ms",
                request_id,
                output.detections.len(),
                output.width,
                output.height,
                started.elapsed().as_millis()
            ),
            Err(e) => warn!("[{}] Detection failed: {}", request_id, e),
        }

        result
    }

    fn normalize(
        &self,
        request_id: Uuid,
        output: &DetectorOutput,
    ) -> Result<Vec<Detection>, PipelineError> {
        self.normalizer.normalize(output).map_err(|e| {
            warn!("[{}] Normalization failed: {}", request_id, e);
            e
        })
    }
}
