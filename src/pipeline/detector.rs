// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Process-wide detector adapter
//!
//! Constructed once at startup and shared by every request. Calls into a
//! non-reentrant backend are serialized behind a gate.

use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

use super::errors::{sanitize_paths, PipelineError};
use super::ingest::ImageAsset;
use crate::vision::{DetectorOutput, ObjectDetector, YoloConfig, YoloDetector};

/// Shared handle to the loaded detector
#[derive(Clone)]
pub struct DetectorService {
    detector: Arc<dyn ObjectDetector>,
    gate: Arc<Mutex<()>>,
}

impl std::fmt::Debug for DetectorService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorService")
            .field("detector", &self.detector.name())
            .field("reentrant", &self.detector.is_reentrant())
            .finish()
    }
}

impl DetectorService {
    /// Load the YOLO weights named by `config`
    ///
    /// # Errors
    /// `ResourceNotFound` if the weights file is missing or ONNX Runtime
    /// cannot load it. Either way the service must not start.
    pub fn load(config: &YoloConfig) -> Result<Self, PipelineError> {
        if !config.model_path.is_file() {
            return Err(PipelineError::ResourceNotFound(format!(
                "model weights not found at {}",
                config.model_path.display()
            )));
        }

        let detector = YoloDetector::new(config)
            .map_err(|e| {
                PipelineError::ResourceNotFound(sanitize_paths(&format!(
                    "model weights could not be loaded: {:#}",
                    e
                )))
            })?;

        info!("Detector service ready: {:?}", detector);
        Ok(Self::from_detector(Arc::new(detector)))
    }

    /// Wrap an already constructed detector
    pub fn from_detector(detector: Arc<dyn ObjectDetector>) -> Self {
        Self {
            detector,
            gate: Arc::new(Mutex::new(())),
        }
    }

    pub fn name(&self) -> &str {
        self.detector.name()
    }

    pub fn is_ready(&self) -> bool {
        self.detector.is_ready()
    }

    /// Run detection on a staged image
    ///
    /// Blocking. Errors are path-sanitized `DetectorFailure`s.
    pub fn detect(&self, asset: &ImageAsset) -> Result<DetectorOutput, PipelineError> {
        let _guard = if self.detector.is_reentrant() {
            None
        } else {
            // the gate guards no data, a poisoned lock is still usable
            Some(self.gate.lock().unwrap_or_else(PoisonError::into_inner))
        };

        debug!(
            "Running {} on {} ({} bytes)",
            self.detector.name(),
            asset.filename(),
            asset.size_bytes()
        );

        self.detector
            .detect(asset.path())
            .map_err(|e| PipelineError::detector(format!("{:#}", e)))
    }
}
