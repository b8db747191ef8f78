// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Prediction endpoint handler

use axum::{extract::State, Json};
use axum_extra::extract::multipart::{Multipart, MultipartRejection};
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::api::multipart::FormData;
use crate::pipeline::PredictionResult;

/// POST /predict - Detections and image metadata only
///
/// Never binds patient context, never hashes, never explains. Extra form
/// fields are ignored.
///
/// # Errors
/// - 400 Bad Request: missing or non-image upload
/// - 503 Service Unavailable: detector not ready
/// - 500 Internal Server Error: detection failure
pub async fn predict_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictionResult>, ApiError> {
    let multipart = multipart.map_err(|e| {
        warn!("Predict request is not multipart: {}", e);
        ApiError::InvalidRequest(format!("Expected a multipart form: {}", e))
    })?;

    let mut form = FormData::read(multipart).await?;
    let upload = form.take_image()?;

    // client errors win over readiness
    upload
        .validate(state.pipeline.max_upload_bytes())
        .map_err(|e| ApiError::from_pipeline(e, "Prediction"))?;

    if !state.pipeline.detector().is_ready() {
        warn!("Detector not ready");
        return Err(ApiError::ServiceUnavailable("Model not loaded".to_string()));
    }

    let result = state
        .pipeline
        .predict(upload)
        .await
        .map_err(|e| ApiError::from_pipeline(e, "Prediction"))?;

    info!("Predict complete: {} detections", result.detections.len());

    Ok(Json(result))
}
