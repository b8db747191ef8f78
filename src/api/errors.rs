// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::pipeline::PipelineError;

/// Body of every error response: `{ "error": string }`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Client-caused: bad media type, malformed form, missing field
    InvalidRequest(String),
    /// The detector failed on this request
    DetectionFailed(String),
    /// Any other pipeline fault; message is already generic
    InternalError(String),
    /// Model not loaded
    ServiceUnavailable(String),
}

impl ApiError {
    /// Map a pipeline failure for the named flow (`"Analysis"`, `"Prediction"`)
    pub fn from_pipeline(err: PipelineError, flow: &str) -> Self {
        match err {
            PipelineError::InvalidInput(msg) => ApiError::InvalidRequest(msg),
            PipelineError::DetectorFailure(msg) => {
                ApiError::DetectionFailed(format!("{} failed: {}", flow, msg))
            }
            PipelineError::ResourceNotFound(_) => {
                ApiError::ServiceUnavailable("Model not loaded".to_string())
            }
            PipelineError::Internal(_) => ApiError::InternalError(format!(
                "{} failed: internal pipeline error",
                flow
            )),
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        let error = match self {
            ApiError::InvalidRequest(msg)
            | ApiError::DetectionFailed(msg)
            | ApiError::InternalError(msg)
            | ApiError::ServiceUnavailable(msg) => msg.clone(),
        };
        ErrorResponse { error }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidRequest(_) => 400,
            ApiError::DetectionFailed(_) | ApiError::InternalError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::DetectionFailed(msg) => write!(f, "Detection failed: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_response())).into_response()
    }
}
