// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Upload validation and request-scoped image storage

use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::errors::{sanitize_paths, PipelineError};
use crate::vision::media_type_to_extension;

/// File name reported when the client sent none
pub const DEFAULT_UPLOAD_NAME: &str = "upload";

/// Message returned for non-image uploads
pub const INVALID_FILE_TYPE_MESSAGE: &str = "Invalid file type. Please upload an image file.";

/// Raw upload as received from the client
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub bytes: Vec<u8>,
    /// Declared media type, e.g. `image/png`
    pub content_type: Option<String>,
    /// Client-supplied file name
    pub filename: Option<String>,
}

impl Upload {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            content_type: None,
            filename: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// File name for `image_metadata`
    pub fn display_name(&self) -> &str {
        self.filename
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_UPLOAD_NAME)
    }

    /// Check media type and size without touching storage
    pub fn validate(&self, max_bytes: usize) -> Result<(), PipelineError> {
        match self.content_type.as_deref() {
            Some(media_type) if is_image_media_type(media_type) => {}
            _ => {
                return Err(PipelineError::InvalidInput(
                    INVALID_FILE_TYPE_MESSAGE.to_string(),
                ))
            }
        }

        if self.bytes.is_empty() {
            return Err(PipelineError::InvalidInput(
                "Uploaded image is empty".to_string(),
            ));
        }

        if self.bytes.len() > max_bytes {
            return Err(PipelineError::InvalidInput(format!(
                "Uploaded image is {} bytes, the limit is {} bytes",
                self.bytes.len(),
                max_bytes
            )));
        }

        Ok(())
    }
}

/// Whether a declared media type denotes an image
pub fn is_image_media_type(media_type: &str) -> bool {
    media_type.trim().to_ascii_lowercase().starts_with("image/")
}

/// An upload materialized into a temporary file for one request
///
/// The file is removed when the asset is dropped or released, on every
/// exit path.
#[derive(Debug)]
pub struct ImageAsset {
    file: NamedTempFile,
    filename: String,
    media_type: String,
    size_bytes: usize,
}

impl ImageAsset {
    /// Validate `upload` and write it to scoped storage
    pub fn ingest(upload: Upload, max_bytes: usize) -> Result<Self, PipelineError> {
        upload.validate(max_bytes)?;

        let filename = upload.display_name().to_string();
        let media_type = upload
            .content_type
            .as_deref()
            .map(|m| m.trim().to_ascii_lowercase())
            .unwrap_or_default();

        let mut file = tempfile::Builder::new()
            .prefix("healvision-")
            .suffix(media_type_to_extension(&media_type))
            .tempfile()
            .map_err(storage_error)?;
        file.write_all(&upload.bytes).map_err(storage_error)?;
        file.flush().map_err(storage_error)?;

        debug!(
            "Staged upload {} ({}, {} bytes)",
            filename,
            media_type,
            upload.bytes.len()
        );

        Ok(Self {
            file,
            filename,
            media_type,
            size_bytes: upload.bytes.len(),
        })
    }

    /// Location of the staged bytes, valid while the asset lives
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// Remove the staged file now, reporting failures to the log
    pub fn release(self) {
        if let Err(e) = self.file.close() {
            warn!(
                "Failed to remove staged upload: {}",
                sanitize_paths(&e.to_string())
            );
        }
    }
}

fn storage_error(err: std::io::Error) -> PipelineError {
    PipelineError::Internal(format!(
        "failed to stage upload: {}",
        sanitize_paths(&err.to_string())
    ))
}
