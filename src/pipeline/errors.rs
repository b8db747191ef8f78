// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error taxonomy for the analysis pipeline
//!
//! - `InvalidInput` - client-caused (bad media type, empty upload, bad form field)
//! - `ResourceNotFound` - a required artifact such as the model weights is missing
//! - `DetectorFailure` - the detection capability failed for this request
//! - `Internal` - any other fault during normalization, binding, hashing or explanation

use thiserror::Error;

/// Placeholder substituted for filesystem paths in surfaced messages
pub const REDACTED_PATH: &str = "<path>";

/// Errors produced by the analysis pipeline
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Declared media type is not an image, or the upload is otherwise unusable
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A required artifact (e.g. model weights) is missing
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// The detector raised during a request. The message is path-sanitized.
    #[error("Detector failure: {0}")]
    DetectorFailure(String),

    /// Unexpected fault in a later pipeline stage
    #[error("Internal pipeline error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Build a `DetectorFailure` from any error, stripping local paths
    pub fn detector<E: std::fmt::Display>(err: E) -> Self {
        PipelineError::DetectorFailure(sanitize_paths(&err.to_string()))
    }

    /// Whether the failure was caused by the client
    pub fn is_client_error(&self) -> bool {
        matches!(self, PipelineError::InvalidInput(_))
    }
}

/// Replace anything that looks like a local filesystem path with `<path>`
///
/// Handles absolute unix paths, home-relative (`~/`), dot-relative
/// (`./`, `../`) and Windows drive paths. Surrounding quotes, brackets and
/// trailing punctuation are preserved.
pub fn sanitize_paths(message: &str) -> String {
    let mut out = String::with_capacity(message.len());

    for piece in message.split_inclusive(char::is_whitespace) {
        let body = piece.trim_end_matches(char::is_whitespace);
        let trailing_ws = &piece[body.len()..];

        let core_start = body
            .find(|c: char| !matches!(c, '"' | '\'' | '(' | '[' | '{' | '<' | '`'))
            .unwrap_or(body.len());
        let core_end = body
            .rfind(|c: char| !matches!(c, '"' | '\'' | ')' | ']' | '}' | '>' | '`' | ',' | ';' | ':'))
            .map(|i| i + body[i..].chars().next().map_or(1, char::len_utf8))
            .unwrap_or(core_start)
            .max(core_start);

        let core = &body[core_start..core_end];
        let path_start = if looks_like_path(core) {
            Some(core_start)
        } else {
            embedded_path_start(core).map(|i| core_start + i)
        };

        match path_start {
            Some(start) => {
                out.push_str(&body[..start]);
                out.push_str(REDACTED_PATH);
                out.push_str(&body[core_end..]);
            }
            None => out.push_str(body),
        }
        out.push_str(trailing_ws);
    }

    out
}

/// Offset of a path glued to a prefix, as in `file=/tmp/x` or `open(/tmp/x`
fn embedded_path_start(token: &str) -> Option<usize> {
    token
        .char_indices()
        .filter(|(_, c)| matches!(c, '=' | '(' | ':'))
        .map(|(i, c)| i + c.len_utf8())
        .find(|&start| looks_like_path(&token[start..]))
}

fn looks_like_path(token: &str) -> bool {
    if token.len() < 2 {
        return false;
    }
    if token.starts_with('/') || token.starts_with("~/") {
        return true;
    }
    if token.starts_with("./") || token.starts_with("../") {
        return true;
    }
    let bytes = token.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
}
