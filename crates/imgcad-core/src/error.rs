// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for imgcad.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for all imgcad operations.
#[derive(Debug, Error)]
pub enum ImgcadError {
    // -- Input --
    #[error("the image file {} does not exist", .0.display())]
    SourceNotFound(PathBuf),

    // -- Image processing --
    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- CAD host --
    #[error("CAD host is not available on this platform")]
    HostUnavailable,

    #[error("{operation} failed: {detail}")]
    Automation { operation: String, detail: String },

    #[error("drawing {} already exists", .0.display())]
    DrawingExists(PathBuf),

    // -- Configuration / persistence --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ImgcadError {
    /// Build an [`ImgcadError::Automation`] for a named host operation.
    pub fn automation(operation: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        Self::Automation {
            operation: operation.into(),
            detail: detail.to_string(),
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ImgcadError>;
