// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing module for chest X-ray analysis
//!
//! This module provides:
//! - Image decoding and format sniffing
//! - Letterbox preprocessing
//! - The `ObjectDetector` capability and its YOLOv8 implementation
//!
//! Inference runs on CPU via ONNX Runtime.

pub mod detector;
pub mod image_utils;
pub mod preprocessing;
pub mod yolo;

pub use detector::{DetectorOutput, ObjectDetector, RawDetection};
pub use image_utils::{
    decode_image_bytes, detect_format, load_image_file, media_type_to_extension, ImageError,
    ImageInfo,
};
pub use preprocessing::{preprocess_for_yolo, LetterboxInfo, YOLO_INPUT_SIZE};
pub use yolo::{YoloConfig, YoloDetector};
