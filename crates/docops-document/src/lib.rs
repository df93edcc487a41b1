// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docops-document — Document capabilities for the docops service.
//
// Provides PDF operations (page count, extract, concatenate, text extraction,
// creation from text or images), image decoding, minimal DOCX packaging, the
// PDF ↔ Word converters, and probing of external rendering backends.

pub mod backend;
pub mod convert;
pub mod docx;
pub mod image;
pub mod pdf;

// Re-export the primary structs so callers can use `docops_document::PdfReader` etc.
pub use backend::BackendStatus;
pub use convert::{PdfToWordConverter, TextPdfToWord, WordToPdfRenderer, renderer_for};
pub use docx::{DocxReader, DocxWriter};
pub use image::processor::ImageProcessor;
pub use pdf::reader::PdfReader;
pub use pdf::writer::PdfWriter;
