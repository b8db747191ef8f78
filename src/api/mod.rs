// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod analyze;
pub mod errors;
pub mod handlers;
pub mod http_server;
pub mod multipart;
pub mod predict;

pub use analyze::analyze_handler;
pub use errors::{ApiError, ErrorResponse};
pub use handlers::{health_handler, root_handler, HealthResponse, RootResponse};
pub use http_server::{create_app, start_server, AppState};
pub use multipart::FormData;
pub use predict::predict_handler;
