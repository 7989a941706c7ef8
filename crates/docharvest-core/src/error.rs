// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Docharvest.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ArtifactKind;

/// Top-level error type for all Docharvest operations.
#[derive(Debug, Error)]
pub enum HarvestError {
    // -- Input errors --
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("corrupt document {path}: {reason}")]
    CorruptDocument { path: String, reason: String },

    // -- Extraction errors --
    #[error("{kind} extraction failed: {reason}")]
    PartialExtraction { kind: ArtifactKind, reason: String },

    #[error("OCR failed: {0}")]
    Ocr(String),

    // -- Storage / persistence --
    #[error("storage write failed: {0}")]
    StorageWrite(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Configuration --
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl HarvestError {
    /// Shorthand for a [`HarvestError::CorruptDocument`] raised while opening `path`.
    pub fn corrupt(path: impl fmt::Display, reason: impl fmt::Display) -> Self {
        Self::CorruptDocument {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Shorthand for a [`HarvestError::PartialExtraction`] of one artifact kind.
    pub fn partial(kind: ArtifactKind, reason: impl fmt::Display) -> Self {
        Self::PartialExtraction {
            kind,
            reason: reason.to_string(),
        }
    }

    /// Classify this error for per-file reporting.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Self::FileNotFound(_) => ErrorKind::FileNotFound,
            Self::CorruptDocument { .. } => ErrorKind::CorruptDocument,
            Self::PartialExtraction { .. } => ErrorKind::PartialExtractionFailure,
            Self::Ocr(_) => ErrorKind::Ocr,
            Self::StorageWrite(_) | Self::Database(_) | Self::Io(_) => {
                ErrorKind::StorageWriteFailure
            }
            Self::Serialization(_) | Self::Config(_) => ErrorKind::Configuration,
        }
    }
}

/// Coarse error taxonomy reported per input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnsupportedFormat,
    FileNotFound,
    CorruptDocument,
    PartialExtractionFailure,
    StorageWriteFailure,
    Configuration,
    Ocr,
}

impl ErrorKind {
    /// Stable label used in reports and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat => "UnsupportedFormat",
            Self::FileNotFound => "FileNotFound",
            Self::CorruptDocument => "CorruptDocument",
            Self::PartialExtractionFailure => "PartialExtractionFailure",
            Self::StorageWriteFailure => "StorageWriteFailure",
            Self::Configuration => "Configuration",
            Self::Ocr => "Ocr",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, HarvestError>;
