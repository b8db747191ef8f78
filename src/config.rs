// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service configuration

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::pipeline::{LabelTable, DEFAULT_MAX_UPLOAD_BYTES, LUNG_OPACITY_LABEL};
use crate::vision::{YoloConfig, YOLO_INPUT_SIZE};

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_MODEL_PATH: &str = "./models/lung_opacity_yolov8.onnx";
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.7;
pub const DEFAULT_INTRA_THREADS: usize = 4;

/// Runtime configuration for the analysis service
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Address the HTTP server binds to
    pub listen_addr: SocketAddr,
    /// ONNX weights for the lung opacity detector
    pub model_path: PathBuf,
    /// Square detector input size
    pub input_size: u32,
    /// Minimum detector score kept
    pub confidence_threshold: f32,
    /// NMS IoU threshold
    pub iou_threshold: f32,
    /// Largest accepted upload in bytes
    pub max_upload_bytes: usize,
    /// ONNX Runtime intra-op threads
    pub intra_threads: usize,
    /// Class labels, position = class id
    pub class_labels: Vec<String>,
}

impl ServiceConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, falling back to defaults for
    /// missing or unparsable values
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            listen_addr: parse_var(&lookup, "HEALVISION_LISTEN_ADDR")
                .unwrap_or(defaults.listen_addr),
            model_path: lookup("HEALVISION_MODEL_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            input_size: parse_var(&lookup, "HEALVISION_INPUT_SIZE")
                .unwrap_or(defaults.input_size),
            confidence_threshold: parse_var(&lookup, "HEALVISION_CONF_THRESHOLD")
                .unwrap_or(defaults.confidence_threshold),
            iou_threshold: parse_var(&lookup, "HEALVISION_IOU_THRESHOLD")
                .unwrap_or(defaults.iou_threshold),
            max_upload_bytes: parse_var(&lookup, "HEALVISION_MAX_UPLOAD_BYTES")
                .unwrap_or(defaults.max_upload_bytes),
            intra_threads: parse_var(&lookup, "HEALVISION_INTRA_THREADS")
                .unwrap_or(defaults.intra_threads),
            class_labels: lookup("HEALVISION_CLASS_LABELS")
                .map(|v| parse_labels(&v))
                .unwrap_or(defaults.class_labels),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(format!(
                "Confidence threshold must be within [0, 1], got {}",
                self.confidence_threshold
            ));
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(format!(
                "IoU threshold must be within [0, 1], got {}",
                self.iou_threshold
            ));
        }
        if self.input_size == 0 {
            return Err("Input size must be greater than 0".to_string());
        }
        if self.max_upload_bytes == 0 {
            return Err("Max upload bytes must be greater than 0".to_string());
        }
        if self.intra_threads == 0 {
            return Err("Intra threads must be greater than 0".to_string());
        }
        if self.class_labels.is_empty() {
            return Err("At least one class label is required".to_string());
        }
        Ok(())
    }

    /// Class id table for the normalizer
    pub fn label_table(&self) -> LabelTable {
        LabelTable::from_labels(&self.class_labels)
    }

    /// Detector settings
    pub fn yolo_config(&self) -> YoloConfig {
        YoloConfig {
            model_path: self.model_path.clone(),
            input_size: self.input_size,
            confidence_threshold: self.confidence_threshold,
            iou_threshold: self.iou_threshold,
            intra_threads: self.intra_threads,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            input_size: YOLO_INPUT_SIZE,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            intra_threads: DEFAULT_INTRA_THREADS,
            class_labels: vec![LUNG_OPACITY_LABEL.to_string()],
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|v| v.trim().parse().ok())
}

/// Split a comma separated label list, dropping blanks
pub fn parse_labels(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect()
}
