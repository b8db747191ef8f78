// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLOv8 lung opacity detector on ONNX Runtime
//!
//! Loads a YOLOv8 ONNX export and runs it on CPU. Output of shape
//! `[1, 4 + num_classes, anchors]` (or its transpose) is decoded into
//! corner boxes in source pixel space, filtered by confidence and reduced
//! with per-class non-maximum suppression.

use anyhow::{Context, Result};
use ndarray::{Array4, ArrayD, ArrayViewD, IxDyn};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::detector::{DetectorOutput, ObjectDetector, RawDetection};
use super::image_utils::load_image_file;
use super::preprocessing::{preprocess_for_yolo, LetterboxInfo, YOLO_INPUT_SIZE};

/// Upper bound on detections kept after NMS
pub const MAX_DETECTIONS: usize = 300;

/// Settings for loading and running the detector
#[derive(Debug, Clone)]
pub struct YoloConfig {
    /// Path to the ONNX weights
    pub model_path: PathBuf,
    /// Square input size the model was exported with
    pub input_size: u32,
    /// Minimum class score for a candidate box
    pub confidence_threshold: f32,
    /// IoU above which overlapping boxes of the same class are suppressed
    pub iou_threshold: f32,
    /// ONNX Runtime intra-op threads
    pub intra_threads: usize,
}

impl Default for YoloConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("./models/lung_opacity_yolov8.onnx"),
            input_size: YOLO_INPUT_SIZE,
            confidence_threshold: 0.25,
            iou_threshold: 0.7,
            intra_threads: 4,
        }
    }
}

/// YOLOv8 detector backed by an ONNX Runtime session
///
/// The session is not reentrant; calls are serialized on its mutex.
#[derive(Clone)]
pub struct YoloDetector {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
    /// Model name derived from the weights file stem
    name: String,
    input_size: u32,
    confidence_threshold: f32,
    iou_threshold: f32,
}

impl std::fmt::Debug for YoloDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloDetector")
            .field("name", &self.name)
            .field("input_name", &self.input_name)
            .field("input_size", &self.input_size)
            .field("confidence_threshold", &self.confidence_threshold)
            .field("iou_threshold", &self.iou_threshold)
            .finish_non_exhaustive()
    }
}

impl YoloDetector {
    /// Load the detector from `config.model_path`
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails
    pub fn new(config: &YoloConfig) -> Result<Self> {
        let model_path = config.model_path.as_path();

        if !model_path.exists() {
            anyhow::bail!("YOLO model not found: {}", model_path.display());
        }

        info!("Loading YOLO detector from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(config.intra_threads)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load YOLO model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        if let Some(output) = session.outputs.first() {
            debug!("YOLO output {}: {:?}", output.name, output.output_type);
        }

        let name = model_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "yolov8".to_string());

        info!(
            "✅ YOLO detector loaded (CPU-only, input {}x{})",
            config.input_size, config.input_size
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            name,
            input_size: config.input_size,
            confidence_threshold: config.confidence_threshold,
            iou_threshold: config.iou_threshold,
        })
    }

    /// Run the network on a preprocessed tensor of shape [1, 3, S, S]
    fn infer(&self, input: Array4<f32>) -> Result<ArrayD<f32>> {
        let input_value = Value::from_array(input).context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("detector session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Detection inference failed")?;

        let predictions = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?
            .to_owned();

        Ok(predictions)
    }
}

impl ObjectDetector for YoloDetector {
    fn detect(&self, image_path: &Path) -> Result<DetectorOutput> {
        let (image, image_info) = load_image_file(image_path).context("Failed to load image")?;

        debug!(
            "Decoded image: {}x{}, {} bytes",
            image_info.width, image_info.height, image_info.size_bytes
        );

        let (input, letterbox) = preprocess_for_yolo(&image, self.input_size);
        let predictions = self.infer(input)?;
        debug!("YOLO output shape: {:?}", predictions.shape());

        let detections = decode_predictions(
            predictions.view(),
            &letterbox,
            self.confidence_threshold,
            self.iou_threshold,
        )?;

        Ok(DetectorOutput {
            detections,
            width: image_info.width,
            height: image_info.height,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_reentrant(&self) -> bool {
        // the session mutex already serializes runs
        true
    }
}

/// Decode raw YOLOv8 output into source-space detections
///
/// Accepts `[1, C, N]` (channels first, the default export) or `[1, N, C]`,
/// where `C = 4 + num_classes`. Results are in NMS keep order, i.e.
/// descending confidence.
pub fn decode_predictions(
    output: ArrayViewD<f32>,
    letterbox: &LetterboxInfo,
    confidence_threshold: f32,
    iou_threshold: f32,
) -> Result<Vec<RawDetection>> {
    let shape = output.shape();
    if shape.len() != 3 || shape[0] != 1 {
        anyhow::bail!("Unexpected YOLO output shape: {:?}", shape);
    }

    let channels_first = shape[1] <= shape[2];
    let (channels, anchors) = if channels_first {
        (shape[1], shape[2])
    } else {
        (shape[2], shape[1])
    };

    if channels < 5 {
        anyhow::bail!(
            "YOLO output has {} channels, expected 4 box values plus class scores",
            channels
        );
    }

    let at = |channel: usize, anchor: usize| -> f32 {
        if channels_first {
            output[IxDyn(&[0, channel, anchor])]
        } else {
            output[IxDyn(&[0, anchor, channel])]
        }
    };

    let width = letterbox.original_width as f32;
    let height = letterbox.original_height as f32;
    let mut candidates = Vec::new();

    for i in 0..anchors {
        let (best_class, score) = (4..channels)
            .map(|c| (c - 4, at(c, i)))
            .fold((0usize, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

        if !(score >= confidence_threshold) {
            continue;
        }

        let (cx, cy, w, h) = (at(0, i), at(1, i), at(2, i), at(3, i));
        let (x1, y1) = letterbox.map_to_original(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = letterbox.map_to_original(cx + w / 2.0, cy + h / 2.0);

        let bbox = [
            x1.clamp(0.0, width),
            y1.clamp(0.0, height),
            x2.clamp(0.0, width),
            y2.clamp(0.0, height),
        ];
        if bbox[2] <= bbox[0] || bbox[3] <= bbox[1] {
            continue;
        }

        candidates.push(RawDetection {
            class_id: best_class as u32,
            confidence: score,
            bbox,
        });
    }

    let kept = non_max_suppression(candidates, iou_threshold);
    debug!("YOLO decode kept {} detections", kept.len());
    Ok(kept)
}

/// Greedy per-class NMS, highest confidence first
pub fn non_max_suppression(mut detections: Vec<RawDetection>, iou_threshold: f32) -> Vec<RawDetection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<RawDetection> = Vec::new();
    for det in detections {
        let suppressed = keep
            .iter()
            .any(|k| k.class_id == det.class_id && calculate_iou(&k.bbox, &det.bbox) > iou_threshold);
        if !suppressed {
            keep.push(det);
            if keep.len() == MAX_DETECTIONS {
                break;
            }
        }
    }

    keep
}

/// Intersection over union of two corner boxes
pub fn calculate_iou(box1: &[f32; 4], box2: &[f32; 4]) -> f32 {
    let x1 = box1[0].max(box2[0]);
    let y1 = box1[1].max(box2[1]);
    let x2 = box1[2].min(box2[2]);
    let y2 = box1[3].min(box2[3]);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let area1 = (box1[2] - box1[0]) * (box1[3] - box1[1]);
    let area2 = (box2[2] - box2[0]) * (box2[3] - box2[1]);
    let union = area1 + area2 - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}
