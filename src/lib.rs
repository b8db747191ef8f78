// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod config;
pub mod pipeline;
pub mod version;
pub mod vision;

// Re-export main types
pub use config::ServiceConfig;
pub use pipeline::{
    AnalysisPipeline, AnalysisResult, AnalyzeRequest, Detection, DetectorService, PipelineError,
    PredictionResult,
};
pub use vision::{ObjectDetector, YoloDetector};
