// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for docops.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for all document operations.
#[derive(Debug, Error)]
pub enum DocOpsError {
    // -- Validation errors --
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("invalid page token {0:?}: expected a page number or a range like 2-4")]
    InvalidPageToken(String),

    #[error("page {page} out of range (document has {count} pages)")]
    PageOutOfRange { page: u32, count: u32 },

    #[error("failed to decode image {name}: {detail}")]
    ImageDecode { name: String, detail: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    // -- Conversion errors --
    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("DOCX operation failed: {0}")]
    DocxError(String),

    #[error("{engine} failed: {detail}")]
    Backend { engine: String, detail: String },

    #[error("operation timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("operation cancelled before it finished")]
    Cancelled,

    #[error("internal failure: {0}")]
    Internal(String),

    // -- Dependency errors --
    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(String),
}

/// The three failure classes reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or missing input.
    Validation,
    /// An underlying conversion capability failed.
    Conversion,
    /// A required rendering/conversion backend is missing.
    DependencyUnavailable,
}

impl DocOpsError {
    /// Classify this error into the caller-facing taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_)
            | Self::InvalidPageToken(_)
            | Self::PageOutOfRange { .. }
            | Self::ImageDecode { .. }
            | Self::Config(_) => ErrorKind::Validation,
            Self::PdfError(_)
            | Self::DocxError(_)
            | Self::Backend { .. }
            | Self::Timeout(_)
            | Self::Cancelled
            | Self::Io(_)
            | Self::Serialization(_)
            | Self::Internal(_) => ErrorKind::Conversion,
            Self::DependencyUnavailable(_) => ErrorKind::DependencyUnavailable,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Validation => "ValidationError",
            Self::Conversion => "ConversionError",
            Self::DependencyUnavailable => "DependencyUnavailableError",
        };
        f.write_str(label)
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocOpsError>;
