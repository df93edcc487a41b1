// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// DOCX writer — assemble a word-processing package in memory with `docx-rs`.

use std::io::Cursor;

use docops_core::error::{DocOpsError, Result};
use docx_rs::{BreakType, Docx, Paragraph, Run};
use tracing::{debug, instrument};

use super::Block;

/// Builds a DOCX package from a sequence of [`Block`]s.
#[derive(Debug, Default)]
pub struct DocxWriter {
    blocks: Vec<Block>,
}

impl DocxWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paragraph(&mut self, text: impl Into<String>) -> &mut Self {
        self.blocks.push(Block::Paragraph(text.into()));
        self
    }

    pub fn page_break(&mut self) -> &mut Self {
        self.blocks.push(Block::PageBreak);
        self
    }

    pub fn extend(&mut self, blocks: impl IntoIterator<Item = Block>) -> &mut Self {
        self.blocks.extend(blocks);
        self
    }

    /// Serialise the package to bytes.
    #[instrument(skip(self), fields(blocks = self.blocks.len()))]
    pub fn finish(&self) -> Result<Vec<u8>> {
        let docx = self
            .blocks
            .iter()
            .fold(Docx::new(), |docx, block| docx.add_paragraph(paragraph(block)));

        let mut buffer = Cursor::new(Vec::new());
        docx.build()
            .pack(&mut buffer)
            .map_err(|err| DocOpsError::DocxError(format!("cannot write package: {err}")))?;
        let bytes = buffer.into_inner();
        debug!(package_bytes = bytes.len(), "DOCX package written");
        Ok(bytes)
    }
}

/// One block as a paragraph: `\n` becomes a line break, `\t` a tab.
fn paragraph(block: &Block) -> Paragraph {
    match block {
        Block::PageBreak => Paragraph::new().add_run(Run::new().add_break(BreakType::Page)),
        Block::Paragraph(text) if text.is_empty() => Paragraph::new(),
        Block::Paragraph(text) => {
            let text = sanitize(text);
            let mut run = Run::new();
            for (i, line) in text.split('\n').enumerate() {
                if i > 0 {
                    run = run.add_break(BreakType::TextWrapping);
                }
                for (j, segment) in line.split('\t').enumerate() {
                    if j > 0 {
                        run = run.add_tab();
                    }
                    if !segment.is_empty() {
                        run = run.add_text(segment);
                    }
                }
            }
            Paragraph::new().add_run(run)
        }
    }
}

/// Drop characters XML 1.0 forbids in character data.
fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|&c| matches!(c, '\t' | '\n') || (c as u32) >= 0x20)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::DocxReader;
    use std::io::Read;

    fn document_part(package: &[u8]) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(package)).unwrap();
        let mut file = archive.by_name("word/document.xml").unwrap();
        let mut body = String::new();
        file.read_to_string(&mut body).unwrap();
        body
    }

    #[test]
    fn package_has_required_parts() {
        let package = DocxWriter::new().finish().unwrap();
        let archive = zip::ZipArchive::new(Cursor::new(&package)).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        for required in ["[Content_Types].xml", "_rels/.rels", "word/document.xml"] {
            assert!(names.contains(&required), "missing {required}");
        }
    }

    #[test]
    fn markup_characters_survive() {
        let mut writer = DocxWriter::new();
        writer.paragraph("Fish & <Chips> \"quoted\"");
        let reader = DocxReader::from_bytes(&writer.finish().unwrap()).unwrap();
        assert_eq!(
            reader.paragraphs().collect::<Vec<_>>(),
            vec!["Fish & <Chips> \"quoted\""]
        );
    }

    #[test]
    fn page_breaks_and_tabs_are_markup() {
        let mut writer = DocxWriter::new();
        writer.paragraph("a\tb").page_break().paragraph("c");
        let xml = document_part(&writer.finish().unwrap());
        assert!(xml.contains("<w:tab"));
        assert!(xml.contains(r#"w:type="page""#));
    }

    #[test]
    fn control_characters_dropped() {
        assert_eq!(sanitize("a\u{0001}b\u{000C}c\td"), "abc\td");
    }
}
