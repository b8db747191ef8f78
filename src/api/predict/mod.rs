// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Prediction API endpoint module
//!
//! Provides POST /predict returning detections without patient binding.

pub mod handler;

pub use handler::predict_handler;
