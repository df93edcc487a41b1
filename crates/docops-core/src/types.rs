// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the docops document service.

use std::path::{Component, Path};
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DocOpsError, Result};
use crate::failure::FailureRecord;
use crate::integrity::hash_bytes;
use crate::selection::PageSelection;

/// Unique identifier for one `execute` invocation (log correlation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvocationId(pub Uuid);

impl InvocationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InvocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InvocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Declared format of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Jpeg,
    Png,
}

impl DocumentFormat {
    /// MIME type string.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    /// Canonical file extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::Jpeg | Self::Png)
    }

    /// Infer document format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }

    /// Infer document format from leading magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"%PDF") {
            Some(Self::Pdf)
        } else if bytes.starts_with(b"PK\x03\x04") {
            Some(Self::Docx)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(Self::Png)
        } else {
            None
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// A named, immutable binary payload with a declared format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    name: String,
    format: DocumentFormat,
    bytes: Vec<u8>,
}

impl Document {
    pub fn new(name: impl Into<String>, format: DocumentFormat, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            format,
            bytes,
        }
    }

    /// Build a document whose format is inferred from its name, falling back
    /// to the content's magic bytes.
    pub fn detect(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let name = name.into();
        let format = Path::new(&name)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(DocumentFormat::from_extension)
            .or_else(|| DocumentFormat::sniff(&bytes))
            .ok_or_else(|| {
                DocOpsError::Validation(format!("unsupported document type: {name}"))
            })?;
        Ok(Self::new(name, format, bytes))
    }

    /// Read a document from the filesystem.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::detect(name, bytes)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Lowercase hex SHA-256 of the content.
    pub fn sha256(&self) -> String {
        hash_bytes(&self.bytes)
    }

    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            name: self.name.clone(),
            format: self.format,
            mime_type: self.format.mime_type().to_string(),
            size: self.bytes.len() as u64,
            sha256: self.sha256(),
        }
    }
}

/// Serializable description of a document (no content).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub name: String,
    pub format: DocumentFormat,
    pub mime_type: String,
    pub size: u64,
    pub sha256: String,
}

/// Standard paper sizes for generated text PDFs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaperSize {
    #[default]
    A4,
    A3,
    A5,
    Letter,
    Legal,
}

impl PaperSize {
    /// Dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (u32, u32) {
        match self {
            Self::A4 => (210, 297),
            Self::A3 => (297, 420),
            Self::A5 => (148, 210),
            Self::Letter => (216, 279),
            Self::Legal => (216, 356),
        }
    }
}

/// The five supported operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    PdfToWord,
    WordToPdf,
    ImagesToPdf,
    SplitPdf,
    MergePdf,
}

impl OperationKind {
    pub const ALL: [Self; 5] = [
        Self::PdfToWord,
        Self::WordToPdf,
        Self::ImagesToPdf,
        Self::SplitPdf,
        Self::MergePdf,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PdfToWord => "pdf-to-word",
            Self::WordToPdf => "word-to-pdf",
            Self::ImagesToPdf => "images-to-pdf",
            Self::SplitPdf => "split-pdf",
            Self::MergePdf => "merge-pdf",
        }
    }

    /// Base name used for the single output when the request gives none.
    pub fn default_output_name(&self) -> &'static str {
        match self {
            Self::PdfToWord | Self::WordToPdf => "converted",
            Self::ImagesToPdf => "output",
            Self::MergePdf => "merged",
            Self::SplitPdf => "page",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = DocOpsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DocOpsError::Validation(format!("unknown operation: {s}")))
    }
}

/// Backend used to render DOCX to PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderEngine {
    /// In-process text flow renderer. Always available.
    #[default]
    Builtin,
    /// `pandoc`, optionally with a LaTeX `--pdf-engine`.
    Pandoc,
    /// LibreOffice in headless mode.
    LibreOffice,
}

impl RenderEngine {
    /// Engines that depend on an external program.
    pub const EXTERNAL: [Self; 2] = [Self::Pandoc, Self::LibreOffice];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Builtin => "builtin",
            Self::Pandoc => "pandoc",
            Self::LibreOffice => "libreoffice",
        }
    }

    pub fn is_external(&self) -> bool {
        !matches!(self, Self::Builtin)
    }
}

impl std::fmt::Display for RenderEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenderEngine {
    type Err = DocOpsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "builtin" => Ok(Self::Builtin),
            "pandoc" => Ok(Self::Pandoc),
            "libreoffice" | "soffice" => Ok(Self::LibreOffice),
            other => Err(DocOpsError::Validation(format!("unknown render engine: {other}"))),
        }
    }
}

/// Inclusive 1-based page range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl PageRange {
    /// Check the range against a document's page count.
    pub fn validate(&self, page_count: u32) -> Result<()> {
        if self.start == 0 || self.start > page_count {
            return Err(DocOpsError::PageOutOfRange {
                page: self.start,
                count: page_count,
            });
        }
        if self.end > page_count {
            return Err(DocOpsError::PageOutOfRange {
                page: self.end,
                count: page_count,
            });
        }
        if self.end < self.start {
            return Err(DocOpsError::Validation(format!(
                "page range end {} is before start {}",
                self.end, self.start
            )));
        }
        Ok(())
    }

    pub fn pages(&self) -> impl Iterator<Item = u32> {
        self.start..=self.end
    }
}

/// How a PDF is split.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMode {
    /// Every page becomes its own document.
    #[default]
    All,
    /// Only the listed pages, in the listed order.
    Pages(PageSelection),
    /// A page list as typed by the user (`"1,3,5-7"`), parsed under the
    /// service's configured selection policy.
    Expression(String),
}

/// Kind-specific parameters. Fields irrelevant to a kind are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OperationOptions {
    /// PdfToWord: pages to convert (default: whole document).
    pub page_range: Option<PageRange>,
    /// WordToPdf: rendering backend (default: from config).
    pub render_engine: Option<RenderEngine>,
    /// WordToPdf via pandoc: LaTeX engine, e.g. `xelatex`.
    pub pdf_engine: Option<String>,
    /// SplitPdf: which pages to emit.
    pub split: SplitMode,
    /// Base name of the single output, without extension.
    pub output_name: Option<String>,
}

/// A complete request: what to do, on which documents, with which options.
#[derive(Debug, Clone)]
pub struct OperationRequest {
    pub kind: OperationKind,
    pub inputs: Vec<Document>,
    pub options: OperationOptions,
}

impl OperationRequest {
    pub fn new(kind: OperationKind, inputs: Vec<Document>) -> Self {
        Self {
            kind,
            inputs,
            options: OperationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: OperationOptions) -> Self {
        self.options = options;
        self
    }

    /// Output file name for single-output kinds, honouring `output_name`.
    ///
    /// The name must be a plain file name: no directories, no `..`.
    pub fn output_file_name(&self, format: DocumentFormat) -> Result<String> {
        let base = self
            .options
            .output_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(self.kind.default_output_name());

        let mut components = Path::new(base).components();
        let plain = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        ) && !base.contains(['/', '\\', '\0']);
        if !plain {
            return Err(DocOpsError::Validation(format!(
                "output name {base:?} must be a plain file name"
            )));
        }

        let suffix = format!(".{}", format.extension());
        if base.to_ascii_lowercase().ends_with(&suffix) {
            Ok(base.to_string())
        } else {
            Ok(format!("{base}{suffix}"))
        }
    }
}

/// Artifacts of a successful operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutput {
    /// Conversion, merge, and image packaging.
    Single(Document),
    /// Split.
    Many(Vec<Document>),
}

impl OperationOutput {
    pub fn documents(&self) -> &[Document] {
        match self {
            Self::Single(doc) => std::slice::from_ref(doc),
            Self::Many(docs) => docs,
        }
    }

    pub fn into_documents(self) -> Vec<Document> {
        match self {
            Self::Single(doc) => vec![doc],
            Self::Many(docs) => docs,
        }
    }
}

/// Everything a caller gets back from one invocation.
#[derive(Debug, Clone)]
pub struct OperationResult {
    pub invocation: InvocationId,
    pub kind: OperationKind,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub outcome: std::result::Result<OperationOutput, FailureRecord>,
}

impl OperationResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn output(&self) -> Option<&OperationOutput> {
        self.outcome.as_ref().ok()
    }

    pub fn failure(&self) -> Option<&FailureRecord> {
        self.outcome.as_ref().err()
    }

    pub fn into_outcome(self) -> std::result::Result<OperationOutput, FailureRecord> {
        self.outcome
    }

    /// Serializable summary of this result.
    pub fn report(&self) -> OperationReport {
        let (status, outputs, failure) = match &self.outcome {
            Ok(output) => (
                OperationStatus::Success,
                output.documents().iter().map(Document::summary).collect(),
                None,
            ),
            Err(failure) => (OperationStatus::Failure, Vec::new(), Some(failure.clone())),
        };
        OperationReport {
            invocation_id: self.invocation,
            kind: self.kind,
            status,
            outputs,
            failure,
            started_at: self.started_at,
            elapsed_ms: self.elapsed.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Success,
    Failure,
}

/// JSON-friendly view of an [`OperationResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationReport {
    pub invocation_id: InvocationId,
    pub kind: OperationKind,
    pub status: OperationStatus,
    pub outputs: Vec<DocumentSummary>,
    pub failure: Option<FailureRecord>,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}
