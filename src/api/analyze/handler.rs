// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Analysis endpoint handler

use axum::{extract::State, Json};
use axum_extra::extract::multipart::{Multipart, MultipartRejection};
use std::sync::Arc;
use tracing::{info, warn};

use super::request::analyze_request_from_form;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::api::multipart::FormData;
use crate::pipeline::AnalysisResult;

/// POST /analyze - Full chest X-ray analysis
///
/// Runs detection on the uploaded image, binds the patient context with a
/// timestamp and audit hash, and optionally adds a clinical explanation.
///
/// # Errors
/// - 400 Bad Request: non-image upload, missing `patient_id`, bad form field
/// - 503 Service Unavailable: detector not ready
/// - 500 Internal Server Error: detection or pipeline failure
pub async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let multipart = multipart.map_err(|e| {
        warn!("Analyze request is not multipart: {}", e);
        ApiError::InvalidRequest(format!("Expected a multipart form: {}", e))
    })?;

    let form = FormData::read(multipart).await?;
    let request = analyze_request_from_form(form).map_err(|e| {
        warn!("Analyze validation failed: {}", e);
        e
    })?;

    // client errors win over readiness
    request
        .upload
        .validate(state.pipeline.max_upload_bytes())
        .map_err(|e| ApiError::from_pipeline(e, "Analysis"))?;

    if !state.pipeline.detector().is_ready() {
        warn!("Detector not ready");
        return Err(ApiError::ServiceUnavailable("Model not loaded".to_string()));
    }

    let result = state
        .pipeline
        .analyze(request)
        .await
        .map_err(|e| ApiError::from_pipeline(e, "Analysis"))?;

    info!(
        "Analyze complete: {} detections for {}",
        result.detections.len(),
        result.image_metadata.filename
    );

    Ok(Json(result))
}
