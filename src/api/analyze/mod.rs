// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Analysis API endpoint module
//!
//! Provides POST /analyze for full lung opacity analysis.

pub mod handler;
pub mod request;

pub use handler::analyze_handler;
pub use request::analyze_request_from_form;
