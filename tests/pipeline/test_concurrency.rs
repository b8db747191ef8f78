// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Concurrency and cancellation tests for the analysis pipeline

use healvision_node::pipeline::Upload;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::common::{pipeline_with, png_bytes, raw, ScriptedDetector};

fn png_upload() -> Upload {
    Upload::new(png_bytes()).with_content_type("image/png")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_non_reentrant_detector_is_serialized() {
    let detector = Arc::new(
        ScriptedDetector::new(vec![raw(0.8, [1.0, 1.0, 4.0, 4.0])])
            .with_delay(Duration::from_millis(40)),
    );
    let pipeline = Arc::new(pipeline_with(detector.clone()));

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.predict(png_upload()).await })
        })
        .collect();

    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.detections.len(), 1);
    }

    assert_eq!(detector.calls(), 6);
    assert_eq!(detector.peak_concurrency(), 1);

    let seen = detector.seen_paths();
    assert!(seen.iter().all(|(_, existed)| *existed));
    assert!(seen.iter().all(|(path, _)| !path.exists()));

    // every request got its own staging file
    let mut paths: Vec<_> = seen.into_iter().map(|(path, _)| path).collect();
    paths.sort();
    paths.dedup();
    assert_eq!(paths.len(), 6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reentrant_detector_is_not_gated() {
    let detector = Arc::new(
        ScriptedDetector::new(vec![])
            .reentrant()
            .with_delay(Duration::from_millis(20)),
    );
    let pipeline = Arc::new(pipeline_with(detector.clone()));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.predict(png_upload()).await })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }
    assert_eq!(detector.calls(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancelled_request_still_releases_upload() {
    let detector = Arc::new(
        ScriptedDetector::new(vec![raw(0.8, [1.0, 1.0, 4.0, 4.0])])
            .with_delay(Duration::from_millis(300)),
    );
    let pipeline = pipeline_with(detector.clone());

    let outcome =
        tokio::time::timeout(Duration::from_millis(50), pipeline.predict(png_upload())).await;
    assert!(outcome.is_err(), "request should have been cancelled");

    // the blocking detection runs to completion and then cleans up
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let seen = detector.seen_paths();
        if let Some((path, existed)) = seen.first() {
            assert!(existed);
            if !path.exists() {
                break;
            }
        }
        assert!(Instant::now() < deadline, "staged upload was never removed");
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}
