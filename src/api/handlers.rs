// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::http_server::AppState;
use crate::version::{API_NAME, VERSION_NUMBER};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RootResponse {
    pub message: String,
    pub version: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
}

/// GET / - Service banner
pub async fn root_handler() -> Json<RootResponse> {
    Json(RootResponse {
        message: API_NAME.to_string(),
        version: VERSION_NUMBER.to_string(),
        status: "active".to_string(),
    })
}

/// GET /health - Liveness and model readiness
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        model_loaded: state.pipeline.detector().is_ready(),
    })
}
