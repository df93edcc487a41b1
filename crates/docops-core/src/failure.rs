// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Structured failure records returned at the operation boundary.
//
// The message always carries the underlying error text verbatim so callers
// can diagnose library failures; the suggestion is a plain-English next step.

use serde::{Deserialize, Serialize};

use crate::error::{DocOpsError, ErrorKind};

/// A failed operation, as reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Taxonomy class of the failure.
    pub kind: ErrorKind,
    /// Verbatim error message, including any library detail.
    pub message: String,
    /// What the caller should try next.
    pub suggestion: String,
}

impl FailureRecord {
    /// Build a failure record from any [`DocOpsError`].
    pub fn from_error(err: &DocOpsError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            suggestion: suggest(err),
        }
    }
}

impl From<&DocOpsError> for FailureRecord {
    fn from(err: &DocOpsError) -> Self {
        Self::from_error(err)
    }
}

impl std::fmt::Display for FailureRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

fn suggest(err: &DocOpsError) -> String {
    match err {
        DocOpsError::Validation(_) => {
            "Check the number and type of input files for this operation.".into()
        }
        DocOpsError::InvalidPageToken(_) => {
            "Enter page numbers separated by commas, e.g. 1,3,5-7.".into()
        }
        DocOpsError::PageOutOfRange { count, .. } => {
            format!("Choose page numbers between 1 and {count}.")
        }
        DocOpsError::ImageDecode { .. } => {
            "The image may be damaged or in an unusual format. Try saving it as a JPEG or PNG first."
                .into()
        }
        DocOpsError::Config(_) => "Fix the configuration file and try again.".into(),
        DocOpsError::PdfError(_) => {
            "The PDF may be damaged or encrypted. Try opening it in a viewer first.".into()
        }
        DocOpsError::DocxError(_) => {
            "The Word file may be damaged. Re-save it as .docx and try again.".into()
        }
        DocOpsError::Backend { engine, .. } => {
            format!("Check the {engine} output above, or try a different render engine.")
        }
        DocOpsError::Timeout(_) => {
            "Large documents take longer. Raise the deadline or split the document first.".into()
        }
        DocOpsError::Cancelled => {
            "The operation was stopped before it finished. Allow more time and try again.".into()
        }
        DocOpsError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => {
                "The file couldn't be found. It may have been moved or deleted.".into()
            }
            std::io::ErrorKind::PermissionDenied => {
                "Check the file permissions or choose a different output directory.".into()
            }
            _ => "Try again. If this keeps happening, the disk may be full.".into(),
        },
        DocOpsError::Serialization(_) | DocOpsError::Internal(_) => {
            "Try again. If this keeps happening, please report it with the input file.".into()
        }
        DocOpsError::DependencyUnavailable(_) => {
            "Install the rendering backend, enable auto_provision, or use the builtin engine."
                .into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_is_verbatim() {
        let err = DocOpsError::Backend {
            engine: "pandoc".into(),
            detail: "xelatex not found".into(),
        };
        let record = FailureRecord::from_error(&err);
        assert_eq!(record.kind, ErrorKind::Conversion);
        assert_eq!(record.message, "pandoc failed: xelatex not found");
        assert!(record.suggestion.contains("pandoc"));
    }

    #[test]
    fn dependency_failure_keeps_its_kind() {
        let err = DocOpsError::DependencyUnavailable("soffice not on PATH".into());
        let record = FailureRecord::from(&err);
        assert_eq!(record.kind, ErrorKind::DependencyUnavailable);
        assert_eq!(
            record.to_string(),
            "DependencyUnavailableError: dependency unavailable: soffice not on PATH"
        );
    }

    #[test]
    fn missing_file_suggestion() {
        let err = DocOpsError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        let record = FailureRecord::from_error(&err);
        assert!(record.suggestion.contains("couldn't be found"));
    }
}
