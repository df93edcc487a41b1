// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// DOCX module — WordprocessingML packaging and text extraction on `docx-rs`.
//
// Only the body text model is supported: paragraphs of plain runs and
// explicit page breaks. Styles and images are neither read nor written.

pub mod reader;
pub mod writer;

pub use reader::DocxReader;
pub use writer::DocxWriter;

/// One unit of document body content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// A paragraph of plain text. Tabs are kept as `\t`, line breaks as `\n`.
    Paragraph(String),
    /// A hard page break.
    PageBreak,
}

