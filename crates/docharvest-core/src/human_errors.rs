// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for per-file failure reports.
//
// Every technical error is mapped to a short summary and a suggestion the
// person running the tool can act on.

use crate::error::{ErrorKind, HarvestError};

/// A human-readable error with a plain summary and an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// One-line summary.
    pub message: String,
    /// What to try next.
    pub suggestion: String,
    /// Taxonomy bucket, shown next to the file name.
    pub kind: ErrorKind,
}

/// Convert a `HarvestError` into a `HumanError`.
pub fn humanize_error(err: &HarvestError) -> HumanError {
    let kind = err.kind();
    match err {
        HarvestError::UnsupportedFormat(detail) => HumanError {
            message: format!("Not a supported document: {detail}."),
            suggestion: "Only .pdf, .docx, .ppt and .pptx files can be extracted.".into(),
            kind,
        },

        HarvestError::FileNotFound(path) => HumanError {
            message: format!("{} does not exist.", path.display()),
            suggestion: "Check the path and that the file has not been moved.".into(),
            kind,
        },

        HarvestError::CorruptDocument { path, reason } => HumanError {
            message: format!("{path} could not be opened ({reason})."),
            suggestion: "The file may be damaged or password-protected. Open and re-save it, then try again.".into(),
            kind,
        },

        HarvestError::PartialExtraction { kind: artifact, reason } => HumanError {
            message: format!("Some {artifact} content could not be read ({reason})."),
            suggestion: "The remaining content was still extracted.".into(),
            kind,
        },

        HarvestError::Ocr(detail) => HumanError {
            message: format!("Text recognition failed ({detail})."),
            suggestion: "Check the OCR model directory, or run with --no-ocr.".into(),
            kind,
        },

        HarvestError::StorageWrite(detail) | HarvestError::Database(detail) => HumanError {
            message: format!("Results could not be saved ({detail})."),
            suggestion: "Check free disk space and write permissions on the output location.".into(),
            kind,
        },

        HarvestError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "Permission denied while saving results.".into(),
                    suggestion: "Choose an output location you can write to.".into(),
                    kind,
                }
            } else {
                HumanError {
                    message: format!("A file operation failed ({io_err})."),
                    suggestion: "Check free disk space and the output location.".into(),
                    kind,
                }
            }
        }

        HarvestError::Serialization(detail) => HumanError {
            message: format!("The configuration file is not valid JSON ({detail})."),
            suggestion: "Fix the configuration file or remove --config.".into(),
            kind,
        },

        HarvestError::Config(detail) => HumanError {
            message: format!("Invalid configuration: {detail}."),
            suggestion: "Fix the configuration file or command-line flags.".into(),
            kind,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_format_lists_accepted_extensions() {
        let human = humanize_error(&HarvestError::UnsupportedFormat(".txt".into()));
        assert_eq!(human.kind, ErrorKind::UnsupportedFormat);
        assert!(human.suggestion.contains(".pptx"));
    }

    #[test]
    fn permission_denied_is_specific() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let human = humanize_error(&HarvestError::Io(io));
        assert_eq!(human.kind, ErrorKind::StorageWriteFailure);
        assert!(human.message.contains("Permission denied"));
    }

    #[test]
    fn corrupt_document_names_the_file() {
        let human = humanize_error(&HarvestError::corrupt("deck.pptx", "invalid zip"));
        assert!(human.message.starts_with("deck.pptx"));
        assert_eq!(human.kind, ErrorKind::CorruptDocument);
    }
}
