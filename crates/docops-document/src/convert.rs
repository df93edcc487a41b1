// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conversion between PDF and Word documents.
//
// PDF → DOCX is a text reconstruction: each source page's text becomes a run
// of paragraphs, separated by page breaks. Layout is not preserved.
//
// DOCX → PDF has three renderers. The builtin one flows the document's
// paragraphs through `PdfWriter`; pandoc and LibreOffice are external
// programs driven through scratch files.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use docops_core::error::{DocOpsError, Result};
use docops_core::{BackendConfig, CancelToken, PageRange, PaperSize, RenderEngine, ServiceConfig};
use tracing::{debug, info, instrument, warn};

use crate::backend::run_command;
use crate::docx::{Block, DocxReader, DocxWriter};
use crate::pdf::{PAGE_BREAK, PdfReader, PdfWriter};

/// Turns a PDF into a Word document.
pub trait PdfToWordConverter: Send + Sync {
    /// Convert the given pages (default: all) of `pdf` into DOCX bytes.
    fn convert(&self, pdf: &[u8], range: Option<PageRange>) -> Result<Vec<u8>>;
}

/// Renders a Word document as PDF.
pub trait WordToPdfRenderer: Send + Sync {
    fn engine(&self) -> RenderEngine;

    /// Render `docx` to PDF bytes. `scratch` is an empty directory owned by
    /// the caller for the duration of the call. External programs are killed
    /// when `cancel` fires.
    fn render(&self, docx: &[u8], scratch: &Path, cancel: &CancelToken) -> Result<Vec<u8>>;
}

// -- PDF → DOCX ---------------------------------------------------------------

/// Text-extraction converter built on `lopdf`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextPdfToWord;

impl PdfToWordConverter for TextPdfToWord {
    #[instrument(skip_all, fields(pdf_len = pdf.len(), ?range))]
    fn convert(&self, pdf: &[u8], range: Option<PageRange>) -> Result<Vec<u8>> {
        let reader = PdfReader::from_bytes(pdf)?;
        let page_count = reader.page_count();
        if page_count == 0 {
            return Err(DocOpsError::PdfError("PDF has no pages".into()));
        }

        let range = range.unwrap_or(PageRange {
            start: 1,
            end: page_count,
        });
        range.validate(page_count)?;

        let mut writer = DocxWriter::new();
        for page in range.pages() {
            if page > range.start {
                writer.page_break();
            }
            let text = reader.page_text(page)?;
            writer.extend(page_blocks(&text));
        }

        info!(pages = range.end - range.start + 1, "PDF text reconstructed");
        writer.finish()
    }
}

/// One paragraph per extracted text line, without trailing blank lines.
fn page_blocks(text: &str) -> Vec<Block> {
    let mut lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    lines
        .into_iter()
        .map(|line| Block::Paragraph(line.to_string()))
        .collect()
}

// -- DOCX → PDF ---------------------------------------------------------------

/// Select the renderer for `engine`. `pdf_engine` only affects pandoc.
pub fn renderer_for(
    engine: RenderEngine,
    config: &ServiceConfig,
    pdf_engine: Option<String>,
) -> Box<dyn WordToPdfRenderer> {
    match engine {
        RenderEngine::Builtin => Box::new(BuiltinRenderer::new(config.paper_size)),
        RenderEngine::Pandoc => Box::new(PandocRenderer {
            backend: config.pandoc.clone(),
            pdf_engine: pdf_engine.or_else(|| config.default_pdf_engine.clone()),
        }),
        RenderEngine::LibreOffice => Box::new(LibreOfficeRenderer {
            backend: config.libreoffice.clone(),
        }),
    }
}

/// In-process renderer: plain text flow, page breaks honoured.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinRenderer {
    paper_size: PaperSize,
}

impl BuiltinRenderer {
    pub fn new(paper_size: PaperSize) -> Self {
        Self { paper_size }
    }
}

impl WordToPdfRenderer for BuiltinRenderer {
    fn engine(&self) -> RenderEngine {
        RenderEngine::Builtin
    }

    #[instrument(skip_all, fields(docx_len = docx.len()))]
    fn render(&self, docx: &[u8], _scratch: &Path, _cancel: &CancelToken) -> Result<Vec<u8>> {
        let blocks = DocxReader::from_bytes(docx)?.into_blocks();
        let text = flow_text(&blocks);
        debug!(blocks = blocks.len(), chars = text.len(), "DOCX flattened");
        PdfWriter::new(self.paper_size).create_from_text(&text)
    }
}

/// Flatten blocks to newline-separated text with form feeds for page breaks.
fn flow_text(blocks: &[Block]) -> String {
    let mut text = String::new();
    let mut after_paragraph = false;
    for block in blocks {
        match block {
            Block::Paragraph(paragraph) => {
                if after_paragraph {
                    text.push('\n');
                }
                text.push_str(&paragraph.replace(PAGE_BREAK, ""));
                after_paragraph = true;
            }
            Block::PageBreak => {
                text.push(PAGE_BREAK);
                after_paragraph = false;
            }
        }
    }
    text
}

/// `pandoc <in> -o <out> [--pdf-engine=<engine>]`.
#[derive(Debug, Clone)]
pub struct PandocRenderer {
    pub backend: BackendConfig,
    pub pdf_engine: Option<String>,
}

impl WordToPdfRenderer for PandocRenderer {
    fn engine(&self) -> RenderEngine {
        RenderEngine::Pandoc
    }

    #[instrument(skip_all, fields(program = %self.backend.program, pdf_engine = ?self.pdf_engine))]
    fn render(&self, docx: &[u8], scratch: &Path, cancel: &CancelToken) -> Result<Vec<u8>> {
        let input = stage_input(docx, scratch)?;
        let output = scratch.join("output.pdf");

        let mut args: Vec<OsString> = vec![
            input.into_os_string(),
            "-o".into(),
            output.clone().into_os_string(),
        ];
        if let Some(engine) = &self.pdf_engine {
            args.push(format!("--pdf-engine={engine}").into());
        }

        run_command(self.engine(), &self.backend.program, &args, cancel)?;
        collect_output(self.engine(), &output)
    }
}

/// `soffice -env:UserInstallation=<profile> --headless --convert-to pdf
/// --outdir <dir> <in>`, with a private profile inside the scratch directory
/// so concurrent conversions never share one.
#[derive(Debug, Clone)]
pub struct LibreOfficeRenderer {
    pub backend: BackendConfig,
}

impl WordToPdfRenderer for LibreOfficeRenderer {
    fn engine(&self) -> RenderEngine {
        RenderEngine::LibreOffice
    }

    #[instrument(skip_all, fields(program = %self.backend.program))]
    fn render(&self, docx: &[u8], scratch: &Path, cancel: &CancelToken) -> Result<Vec<u8>> {
        let input = stage_input(docx, scratch)?;
        let outdir = scratch.join("out");
        std::fs::create_dir_all(&outdir)?;

        let profile = scratch.join("lo-profile");

        let args: Vec<OsString> = vec![
            format!("-env:UserInstallation={}", file_url(&profile)).into(),
            "--headless".into(),
            "--convert-to".into(),
            "pdf".into(),
            "--outdir".into(),
            outdir.clone().into_os_string(),
            input.into_os_string(),
        ];

        run_command(self.engine(), &self.backend.program, &args, cancel)?;
        collect_output(self.engine(), &outdir.join("input.pdf"))
    }
}

/// `file://` URL for an absolute path, percent-encoding reserved bytes.
fn file_url(path: &Path) -> String {
    let mut url = String::from("file://");
    for byte in path.as_os_str().as_encoded_bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'/' | b'-' | b'.' | b'_' | b'~' => {
                url.push(char::from(*byte))
            }
            other => url.push_str(&format!("%{other:02X}")),
        }
    }
    url
}

fn stage_input(docx: &[u8], scratch: &Path) -> Result<PathBuf> {
    let input = scratch.join("input.docx");
    std::fs::write(&input, docx)?;
    Ok(input)
}

/// Read the file an external engine was asked to produce. Some engines exit
/// zero without writing anything when the input is unusable.
fn collect_output(engine: RenderEngine, path: &Path) -> Result<Vec<u8>> {
    match std::fs::read(path) {
        Ok(bytes) if !bytes.is_empty() => Ok(bytes),
        Ok(_) => Err(DocOpsError::Backend {
            engine: engine.to_string(),
            detail: format!("{} is empty", path.display()),
        }),
        Err(err) => {
            warn!(%engine, path = %path.display(), %err, "Backend produced no output");
            Err(DocOpsError::Backend {
                engine: engine.to_string(),
                detail: format!("no output written to {}", path.display()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::reader::fixtures::pdf_with_pages;

    #[test]
    fn pdf_to_word_keeps_page_text() {
        let pdf = pdf_with_pages(&[(100, "Alpha"), (100, "Beta"), (100, "Gamma")]);
        let docx = TextPdfToWord.convert(&pdf, None).unwrap();

        let blocks = DocxReader::from_bytes(&docx).unwrap().into_blocks();
        let breaks = blocks.iter().filter(|b| **b == Block::PageBreak).count();
        assert_eq!(breaks, 2);

        let text: Vec<String> = blocks
            .iter()
            .filter_map(|b| match b {
                Block::Paragraph(t) => Some(t.clone()),
                Block::PageBreak => None,
            })
            .collect();
        let joined = text.join(" ");
        assert!(joined.contains("Alpha") && joined.contains("Beta") && joined.contains("Gamma"));
    }

    #[test]
    fn pdf_to_word_honours_range() {
        let pdf = pdf_with_pages(&[(100, "Alpha"), (100, "Beta"), (100, "Gamma")]);
        let docx = TextPdfToWord
            .convert(&pdf, Some(PageRange { start: 2, end: 2 }))
            .unwrap();
        let reader = DocxReader::from_bytes(&docx).unwrap();
        let joined: String = reader.paragraphs().collect();
        assert!(joined.contains("Beta"));
        assert!(!joined.contains("Alpha") && !joined.contains("Gamma"));
        assert!(!reader.blocks().contains(&Block::PageBreak));
    }

    #[test]
    fn pdf_to_word_rejects_bad_range() {
        let pdf = pdf_with_pages(&[(100, "a"), (100, "b")]);
        let err = TextPdfToWord
            .convert(&pdf, Some(PageRange { start: 1, end: 5 }))
            .unwrap_err();
        assert_eq!(err.kind(), docops_core::ErrorKind::Validation);
    }

    #[test]
    fn pdf_to_word_rejects_garbage() {
        let err = TextPdfToWord.convert(b"hello", None).unwrap_err();
        assert_eq!(err.kind(), docops_core::ErrorKind::Conversion);
    }

    #[test]
    fn flow_text_maps_breaks() {
        let blocks = vec![
            Block::Paragraph("one".into()),
            Block::Paragraph("two".into()),
            Block::PageBreak,
            Block::Paragraph("three".into()),
        ];
        assert_eq!(flow_text(&blocks), format!("one\ntwo{PAGE_BREAK}three"));
    }

    #[test]
    fn builtin_renderer_paginates() {
        let mut writer = DocxWriter::new();
        writer.paragraph("first page").page_break().paragraph("second page");
        let docx = writer.finish().unwrap();

        let scratch = tempfile::tempdir().unwrap();
        let pdf = BuiltinRenderer::new(PaperSize::A4)
            .render(&docx, scratch.path(), &CancelToken::new())
            .unwrap();
        assert_eq!(PdfReader::from_bytes(&pdf).unwrap().page_count(), 2);
    }

    #[test]
    fn builtin_renderer_rejects_non_docx() {
        let scratch = tempfile::tempdir().unwrap();
        let err = BuiltinRenderer::new(PaperSize::A4)
            .render(b"plain text", scratch.path(), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, DocOpsError::DocxError(_)));
    }

    #[test]
    fn renderer_selection() {
        let config = ServiceConfig {
            default_pdf_engine: Some("xelatex".into()),
            ..ServiceConfig::default()
        };
        for engine in [RenderEngine::Builtin, RenderEngine::Pandoc, RenderEngine::LibreOffice] {
            assert_eq!(renderer_for(engine, &config, None).engine(), engine);
        }
    }

    #[cfg(unix)]
    mod external {
        use super::*;

        /// Install an executable shell script standing in for a backend.
        /// A child shell writes it so this process never holds the file open
        /// while other test threads fork.
        fn fake_program(dir: &Path, name: &str, body: &str) -> String {
            let path = dir.join(name).display().to_string();
            let install = format!(
                "cat > '{path}' <<'SCRIPT'\n#!/bin/sh\n{body}\nSCRIPT\nchmod +x '{path}'"
            );
            let status = std::process::Command::new("sh")
                .arg("-c")
                .arg(install)
                .status()
                .unwrap();
            assert!(status.success());
            path
        }

        #[test]
        fn pandoc_arguments_and_output() {
            let bin = tempfile::tempdir().unwrap();
            // $1 = input, $2 = -o, $3 = output, $4 = --pdf-engine=...
            let program = fake_program(
                bin.path(),
                "pandoc",
                r#"[ "$2" = "-o" ] && [ "$4" = "--pdf-engine=xelatex" ] && printf '%%PDF-fake' > "$3""#,
            );
            let renderer = PandocRenderer {
                backend: BackendConfig::new(program),
                pdf_engine: Some("xelatex".into()),
            };
            let scratch = tempfile::tempdir().unwrap();
            let pdf = renderer
                .render(b"PK\x03\x04docx", scratch.path(), &CancelToken::new())
                .unwrap();
            assert_eq!(pdf, b"%PDF-fake");
        }

        #[test]
        fn pandoc_failure_carries_stderr() {
            let bin = tempfile::tempdir().unwrap();
            let program = fake_program(
                bin.path(),
                "pandoc",
                "echo 'xelatex not found. Please select a different --pdf-engine' >&2\nexit 47",
            );
            let renderer = PandocRenderer {
                backend: BackendConfig::new(program),
                pdf_engine: Some("xelatex".into()),
            };
            let scratch = tempfile::tempdir().unwrap();
            let err = renderer
                .render(b"PK", scratch.path(), &CancelToken::new())
                .unwrap_err();
            assert_eq!(err.kind(), docops_core::ErrorKind::Conversion);
            assert!(err.to_string().contains("xelatex not found"));
        }

        #[test]
        fn libreoffice_writes_into_outdir() {
            let bin = tempfile::tempdir().unwrap();
            let scratch = tempfile::tempdir().unwrap();
            let profile = format!(
                "-env:UserInstallation=file://{}/lo-profile",
                scratch.path().display()
            );
            // $1 = private profile, $6 = outdir, $7 = input
            let program = fake_program(
                bin.path(),
                "soffice",
                &format!(
                    r#"[ "$1" = "{profile}" ] && [ "$2" = "--headless" ] && printf '%%PDF-lo' > "$6/$(basename "$7" .docx).pdf""#
                ),
            );
            let renderer = LibreOfficeRenderer {
                backend: BackendConfig::new(program),
            };
            let pdf = renderer
                .render(b"PK", scratch.path(), &CancelToken::new())
                .unwrap();
            assert_eq!(pdf, b"%PDF-lo");
        }

        #[test]
        fn cancelled_render_stops_the_backend() {
            let bin = tempfile::tempdir().unwrap();
            let program = fake_program(bin.path(), "pandoc", "exec sleep 30");
            let renderer = PandocRenderer {
                backend: BackendConfig::new(program),
                pdf_engine: None,
            };
            let cancel = CancelToken::new();
            cancel.cancel();
            let scratch = tempfile::tempdir().unwrap();
            let err = renderer.render(b"PK", scratch.path(), &cancel).unwrap_err();
            assert!(matches!(err, DocOpsError::Cancelled));
        }

        #[test]
        fn file_url_escapes_spaces() {
            assert_eq!(
                file_url(Path::new("/tmp/my docs/lo-profile")),
                "file:///tmp/my%20docs/lo-profile"
            );
        }

        #[test]
        fn silent_backend_without_output_is_conversion_error() {
            let bin = tempfile::tempdir().unwrap();
            let program = fake_program(bin.path(), "soffice", "exit 0");
            let renderer = LibreOfficeRenderer {
                backend: BackendConfig::new(program),
            };
            let scratch = tempfile::tempdir().unwrap();
            let err = renderer
                .render(b"PK", scratch.path(), &CancelToken::new())
                .unwrap_err();
            assert!(matches!(err, DocOpsError::Backend { .. }));
        }
    }
}
