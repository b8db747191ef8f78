// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Shared helpers for the API and pipeline integration tests
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, Response},
};
use chrono::{TimeZone, Utc};
use healvision_node::{
    api::AppState,
    pipeline::{AnalysisPipeline, DetectionNormalizer, DetectorService, FixedClock},
    vision::{DetectorOutput, ObjectDetector, RawDetection},
};
use image::{ImageFormat, Rgb, RgbImage};
use serde_json::Value;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BOUNDARY: &str = "healvision-test-boundary";
pub const IMAGE_WIDTH: u32 = 1024;
pub const IMAGE_HEIGHT: u32 = 768;

/// Detector returning a fixed script and recording every call
pub struct ScriptedDetector {
    detections: Vec<RawDetection>,
    failure: Option<String>,
    ready: bool,
    reentrant: bool,
    delay: Duration,
    calls: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
    seen: Mutex<Vec<(PathBuf, bool)>>,
}

impl ScriptedDetector {
    pub fn new(detections: Vec<RawDetection>) -> Self {
        Self {
            detections,
            failure: None,
            ready: true,
            reentrant: false,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Detector that fails with `message` followed by the staged path
    pub fn failing(message: &str) -> Self {
        let mut detector = Self::new(vec![]);
        detector.failure = Some(message.to_string());
        detector
    }

    pub fn not_ready(mut self) -> Self {
        self.ready = false;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn reentrant(mut self) -> Self {
        self.reentrant = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of overlapping `detect` calls observed
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Staged paths passed in, with whether each existed during the call
    pub fn seen_paths(&self) -> Vec<(PathBuf, bool)> {
        self.seen.lock().unwrap().clone()
    }
}

impl ObjectDetector for ScriptedDetector {
    fn detect(&self, image_path: &Path) -> anyhow::Result<DetectorOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap()
            .push((image_path.to_path_buf(), image_path.exists()));

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if let Some(message) = &self.failure {
            anyhow::bail!("{} {}", message, image_path.display());
        }

        Ok(DetectorOutput {
            detections: self.detections.clone(),
            width: IMAGE_WIDTH,
            height: IMAGE_HEIGHT,
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn is_reentrant(&self) -> bool {
        self.reentrant
    }
}

pub fn raw(confidence: f32, bbox: [f32; 4]) -> RawDetection {
    RawDetection {
        class_id: 0,
        confidence,
        bbox,
    }
}

/// Instant used by the fixed test clock
pub fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock(
        Utc.with_ymd_and_hms(2026, 10, 19, 8, 15, 30).unwrap() + chrono::Duration::microseconds(42),
    ))
}

pub const FIXED_TIMESTAMP: &str = "2026-10-19T08:15:30.000042Z";

pub fn pipeline_with(detector: Arc<ScriptedDetector>) -> AnalysisPipeline {
    AnalysisPipeline::new(
        DetectorService::from_detector(detector),
        DetectionNormalizer::default(),
    )
    .with_clock(fixed_clock())
}

pub fn state_with(detector: Arc<ScriptedDetector>) -> Arc<AppState> {
    Arc::new(AppState::new(pipeline_with(detector)))
}

/// A small real PNG
pub fn png_bytes() -> Vec<u8> {
    let img = RgbImage::from_pixel(16, 12, Rgb([120, 120, 120]));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// One multipart form part
pub enum Part {
    File {
        name: &'static str,
        filename: &'static str,
        content_type: &'static str,
        bytes: Vec<u8>,
    },
    Text {
        name: &'static str,
        value: String,
    },
}

pub fn image_part(content_type: &'static str) -> Part {
    Part::File {
        name: "image",
        filename: "chest_xray.png",
        content_type,
        bytes: png_bytes(),
    }
}

pub fn text_part(name: &'static str, value: &str) -> Part {
    Part::Text {
        name,
        value: value.to_string(),
    }
}

pub fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::File {
                name,
                filename,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: {}\r\n\r\n",
                        name, filename, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_request(uri: &str, parts: &[Part]) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Number of decimal places in the shortest representation of `value`
pub fn decimals(value: f64) -> usize {
    let text = format!("{}", value);
    text.split('.').nth(1).map_or(0, str::len)
}
