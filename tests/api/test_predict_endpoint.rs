// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Prediction endpoint tests for POST /predict
//!
//! The minimal flow never carries patient context, explanations or audit
//! fields, even when the client sends patient fields along with the image.

use axum::http::StatusCode;
use healvision_node::api::http_server::create_app;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;

use crate::common::{
    body_json, image_part, multipart_request, raw, state_with, text_part, Part, ScriptedDetector,
};

const FORBIDDEN_KEYS: [&str; 4] = [
    "patient_metadata",
    "timestamp",
    "audit_hash",
    "clinical_explanation",
];

async fn predict(detector: Arc<ScriptedDetector>, parts: &[Part]) -> (StatusCode, Value) {
    let app = create_app(state_with(detector));
    let response = app
        .oneshot(multipart_request("/predict", parts))
        .await
        .unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

#[tokio::test]
async fn test_prediction_shape() {
    let detector = Arc::new(ScriptedDetector::new(vec![raw(
        0.9999,
        [10.5, 20.25, 110.0, 220.75],
    )]));

    let (status, body) = predict(detector.clone(), &[image_part("image/png")]).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(detector.calls(), 1);

    let mut keys: Vec<&str> = body
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["detections", "image_metadata"]);

    assert_eq!(
        body["detections"],
        json!([{
            "label": "lung_opacity",
            "confidence": 0.9999,
            "bbox": [10.5, 20.25, 110.0, 220.75]
        }])
    );
    assert_eq!(body["image_metadata"]["filename"], "chest_xray.png");
}

#[tokio::test]
async fn test_patient_fields_ignored() {
    let detector = Arc::new(ScriptedDetector::new(vec![raw(0.6, [1.0, 2.0, 3.0, 4.0])]));

    let (status, body) = predict(
        detector,
        &[
            image_part("image/png"),
            text_part("patient_id", "P1"),
            text_part("age", "54"),
            text_part("include_explanation", "true"),
        ],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let object = body.as_object().unwrap();
    for key in FORBIDDEN_KEYS {
        assert!(!object.contains_key(key), "unexpected key {}", key);
    }
}

#[tokio::test]
async fn test_non_image_rejected() {
    let detector = Arc::new(ScriptedDetector::new(vec![]));

    let (status, body) = predict(
        detector.clone(),
        &[Part::File {
            name: "image",
            filename: "notes.txt",
            content_type: "text/plain",
            bytes: b"not an x-ray".to_vec(),
        }],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!body["error"].as_str().unwrap().is_empty());
    assert_eq!(detector.calls(), 0);
}

#[tokio::test]
async fn test_non_image_rejected_when_detector_not_ready() {
    let detector = Arc::new(ScriptedDetector::new(vec![]).not_ready());
    let (status, body) = predict(
        detector.clone(),
        &[Part::File {
            name: "image",
            filename: "notes.txt",
            content_type: "text/plain",
            bytes: b"not an x-ray".to_vec(),
        }],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!body["error"].as_str().unwrap().is_empty());
    assert_eq!(detector.calls(), 0);
}

#[tokio::test]
async fn test_detector_not_ready() {
    let detector = Arc::new(ScriptedDetector::new(vec![]).not_ready());
    let (status, body) = predict(detector.clone(), &[image_part("image/png")]).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Model not loaded");
    assert_eq!(detector.calls(), 0);
}

#[tokio::test]
async fn test_missing_image() {
    let detector = Arc::new(ScriptedDetector::new(vec![]));
    let (status, body) = predict(detector.clone(), &[text_part("note", "hello")]).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "image file is required");
    assert_eq!(detector.calls(), 0);
}

#[tokio::test]
async fn test_detector_failure() {
    let detector = Arc::new(ScriptedDetector::failing("inference error on"));
    let (status, body) = predict(detector.clone(), &[image_part("image/png")]).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let error = body["error"].as_str().unwrap();
    assert!(error.starts_with("Prediction failed:"));
    assert!(!error.contains("healvision-"));

    let (path, _) = &detector.seen_paths()[0];
    assert!(!path.exists());
}
