// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use super::analyze::analyze_handler;
use super::handlers::{health_handler, root_handler};
use super::predict::predict_handler;
use crate::pipeline::AnalysisPipeline;

/// Room for multipart boundaries and text fields on top of the image
pub const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared state for all handlers
#[derive(Clone, Debug)]
pub struct AppState {
    pub pipeline: Arc<AnalysisPipeline>,
}

impl AppState {
    pub fn new(pipeline: AnalysisPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

/// Build the router
pub fn create_app(state: Arc<AppState>) -> Router {
    let body_limit = state
        .pipeline
        .max_upload_bytes()
        .saturating_add(FORM_OVERHEAD_BYTES);

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/analyze", post(analyze_handler))
        .route("/predict", post(predict_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until Ctrl-C
pub async fn start_server(
    addr: SocketAddr,
    state: Arc<AppState>,
) -> anyhow::Result<()> {
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("API server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        // without a signal handler, keep serving
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
