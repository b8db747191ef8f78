// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Multipart form extraction for the upload endpoints

use axum_extra::extract::Multipart;
use std::collections::HashMap;
use tracing::debug;

use super::errors::ApiError;
use crate::pipeline::Upload;

/// Name of the file field carrying the X-ray
pub const IMAGE_FIELD: &str = "image";

/// A fully read multipart form
#[derive(Debug, Default)]
pub struct FormData {
    image: Option<Upload>,
    fields: HashMap<String, String>,
}

impl FormData {
    /// Drain every field of `multipart`
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = FormData::default();

        while let Some(field) = multipart.next_field().await.map_err(malformed)? {
            let name = field.name().unwrap_or_default().to_string();

            if name == IMAGE_FIELD {
                let content_type = field.content_type().map(str::to_string);
                let filename = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(malformed)?;
                debug!(
                    "Received image field: {:?} ({:?}, {} bytes)",
                    filename,
                    content_type,
                    bytes.len()
                );
                form.image = Some(Upload {
                    bytes: bytes.to_vec(),
                    content_type,
                    filename,
                });
            } else {
                let value = field.text().await.map_err(malformed)?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    /// Build a form directly, bypassing HTTP
    pub fn new(image: Option<Upload>, fields: HashMap<String, String>) -> Self {
        Self { image, fields }
    }

    /// Take the uploaded image; its absence is a client error
    pub fn take_image(&mut self) -> Result<Upload, ApiError> {
        self.image
            .take()
            .ok_or_else(|| ApiError::InvalidRequest("image file is required".to_string()))
    }

    /// Text value of `name`, trimmed; blank counts as absent
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Value of `name` exactly as sent; whitespace-only counts as absent
    pub fn verbatim_text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .filter(|v| !v.trim().is_empty())
            .cloned()
    }

    pub fn bool_or(&self, name: &str, default: bool) -> Result<bool, ApiError> {
        self.text(name)
            .map_or(Ok(default), |value| parse_bool(name, value))
    }

    pub fn optional_i64(&self, name: &str) -> Result<Option<i64>, ApiError> {
        self.text(name)
            .map(|value| parse_i64(name, value))
            .transpose()
    }
}

fn malformed(err: axum_extra::extract::multipart::MultipartError) -> ApiError {
    ApiError::InvalidRequest(format!("Malformed multipart body: {}", err))
}

/// Parse a form boolean: true/false, 1/0, yes/no, on/off
pub fn parse_bool(name: &str, value: &str) -> Result<bool, ApiError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(ApiError::InvalidRequest(format!(
            "{} must be a boolean, got '{}'",
            name, other
        ))),
    }
}

/// Parse a form integer
pub fn parse_i64(name: &str, value: &str) -> Result<i64, ApiError> {
    value.trim().parse().map_err(|_| {
        ApiError::InvalidRequest(format!("{} must be an integer, got '{}'", name, value.trim()))
    })
}
