// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Service endpoint tests for GET / and GET /health
//!
//! These tests verify that:
//! - The root banner reports name, version and status
//! - Health reflects detector readiness
//! - Upload routes only accept POST

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use healvision_node::api::http_server::create_app;
use serde_json::json;
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot`

use crate::common::{body_json, state_with, ScriptedDetector};

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_root_banner() {
    let app = create_app(state_with(Arc::new(ScriptedDetector::new(vec![]))));

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({
            "message": "HealVision Medical Imaging API",
            "version": "1.0.0",
            "status": "active"
        })
    );
}

#[tokio::test]
async fn test_health_model_loaded() {
    let app = create_app(state_with(Arc::new(ScriptedDetector::new(vec![]))));

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "status": "healthy", "model_loaded": true })
    );
}

#[tokio::test]
async fn test_health_model_not_ready() {
    let detector = Arc::new(ScriptedDetector::new(vec![]).not_ready());
    let app = create_app(state_with(detector));

    let response = app.oneshot(get("/health")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["model_loaded"], false);
}

#[tokio::test]
async fn test_upload_routes_reject_get() {
    for uri in ["/analyze", "/predict"] {
        let app = create_app(state_with(Arc::new(ScriptedDetector::new(vec![]))));
        let response = app.oneshot(get(uri)).await.unwrap();
        assert_eq!(
            response.status(),
            StatusCode::METHOD_NOT_ALLOWED,
            "GET {} should be rejected",
            uri
        );
    }
}

#[tokio::test]
async fn test_unknown_route() {
    let app = create_app(state_with(Arc::new(ScriptedDetector::new(vec![]))));
    let response = app.oneshot(get("/v1/unknown")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
