// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// DOCX reader — pull paragraph text and page breaks out of a package parsed
// by `docx-rs`.
//
// Only run content is read: text, tabs, and breaks. Paragraph properties
// (including tab-stop definitions), drawings, and text boxes are skipped.
// Top-level table cells contribute their paragraphs in reading order.

use docops_core::error::{DocOpsError, Result};
use docx_rs::{
    Break, BreakType, DocumentChild, Paragraph, ParagraphChild, RunChild, Table, TableCellContent,
    TableChild, TableRowChild,
};
use tracing::{debug, instrument};

use super::Block;

/// Text model of an existing DOCX package.
pub struct DocxReader {
    blocks: Vec<Block>,
}

impl DocxReader {
    /// Open a DOCX package from bytes and collect its body blocks.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let docx = docx_rs::read_docx(data)
            .map_err(|err| DocOpsError::DocxError(format!("not a readable DOCX package: {err}")))?;

        let mut collector = Collector::default();
        for child in &docx.document.children {
            match child {
                DocumentChild::Paragraph(paragraph) => collector.paragraph(paragraph),
                DocumentChild::Table(table) => collector.table(table),
                _ => {}
            }
        }
        debug!(blocks = collector.blocks.len(), "DOCX body read");
        Ok(Self {
            blocks: collector.blocks,
        })
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }

    /// Paragraph texts only, in order.
    pub fn paragraphs(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Paragraph(text) => Some(text.as_str()),
            Block::PageBreak => None,
        })
    }
}

#[derive(Default)]
struct Collector {
    blocks: Vec<Block>,
}

impl Collector {
    /// A paragraph that only holds a page break yields just the break.
    fn paragraph(&mut self, paragraph: &Paragraph) {
        let mut text = String::new();
        let mut broke_page = false;
        self.runs(&paragraph.children, &mut text, &mut broke_page);
        if !text.is_empty() || !broke_page {
            self.blocks.push(Block::Paragraph(text));
        }
    }

    fn runs(&mut self, children: &[ParagraphChild], text: &mut String, broke_page: &mut bool) {
        for child in children {
            match child {
                ParagraphChild::Run(run) => {
                    for item in &run.children {
                        match item {
                            RunChild::Text(t) => text.push_str(&t.text),
                            RunChild::Tab(_) => text.push('\t'),
                            RunChild::Break(br) if is_page_break(br) => {
                                if !text.is_empty() {
                                    self.blocks.push(Block::Paragraph(std::mem::take(text)));
                                }
                                self.blocks.push(Block::PageBreak);
                                *broke_page = true;
                            }
                            RunChild::Break(_) => text.push('\n'),
                            _ => {}
                        }
                    }
                }
                ParagraphChild::Hyperlink(link) => self.runs(&link.children, text, broke_page),
                _ => {}
            }
        }
    }

    fn table(&mut self, table: &Table) {
        for row in &table.rows {
            let TableChild::TableRow(row) = row;
            for cell in &row.cells {
                let TableRowChild::TableCell(cell) = cell;
                for content in &cell.children {
                    if let TableCellContent::Paragraph(paragraph) = content {
                        self.paragraph(paragraph);
                    }
                }
            }
        }
    }
}

fn is_page_break(br: &Break) -> bool {
    *br == Break::new(BreakType::Page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::DocxWriter;
    use std::io::{Cursor, Read, Write};

    /// A writer-produced package whose `word/document.xml` body is replaced.
    fn package_with_body(body: &str) -> Vec<u8> {
        let template = DocxWriter::new().finish().unwrap();
        let mut source = zip::ZipArchive::new(Cursor::new(template)).unwrap();

        let mut buffer = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buffer));
            for i in 0..source.len() {
                let mut file = source.by_index(i).unwrap();
                let name = file.name().to_string();
                zip.start_file(name.as_str(), zip::write::FileOptions::default())
                    .unwrap();
                if name == "word/document.xml" {
                    write!(
                        zip,
                        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
                    )
                    .unwrap();
                } else {
                    let mut data = Vec::new();
                    file.read_to_end(&mut data).unwrap();
                    zip.write_all(&data).unwrap();
                }
            }
            zip.finish().unwrap();
        }
        buffer
    }

    #[test]
    fn reads_back_writer_output() {
        let mut writer = DocxWriter::new();
        writer
            .paragraph("Dear <client> & co,")
            .paragraph("")
            .page_break()
            .paragraph("col1\tcol2\nnext line");
        let reader = DocxReader::from_bytes(&writer.finish().unwrap()).unwrap();

        assert_eq!(
            reader.blocks(),
            &[
                Block::Paragraph("Dear <client> & co,".into()),
                Block::Paragraph(String::new()),
                Block::PageBreak,
                Block::Paragraph("col1\tcol2\nnext line".into()),
            ]
        );
    }

    #[test]
    fn joins_runs_and_skips_properties() {
        let body = r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:rPr><w:b/></w:rPr><w:t>Hel</w:t></w:r><w:r><w:t xml:space="preserve">lo &#x263A;</w:t></w:r></w:p><w:p/>"#;
        let reader = DocxReader::from_bytes(&package_with_body(body)).unwrap();
        assert_eq!(
            reader.blocks(),
            &[Block::Paragraph("Hello ☺".into()), Block::Paragraph(String::new())]
        );
    }

    #[test]
    fn tab_stop_definitions_are_not_text() {
        let body = r#"<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/><w:tab w:val="right" w:pos="9000"/></w:tabs></w:pPr><w:r><w:t>Invoice</w:t></w:r></w:p>"#;
        let reader = DocxReader::from_bytes(&package_with_body(body)).unwrap();
        assert_eq!(reader.blocks(), &[Block::Paragraph("Invoice".into())]);
    }

    #[test]
    fn page_break_mid_paragraph_splits_it() {
        let body = r#"<w:p><w:r><w:t>before</w:t><w:br w:type="page"/><w:t>after</w:t></w:r></w:p>"#;
        let reader = DocxReader::from_bytes(&package_with_body(body)).unwrap();
        assert_eq!(
            reader.blocks(),
            &[
                Block::Paragraph("before".into()),
                Block::PageBreak,
                Block::Paragraph("after".into()),
            ]
        );
        assert_eq!(reader.paragraphs().collect::<Vec<_>>(), vec!["before", "after"]);
    }

    #[test]
    fn not_a_zip_is_docx_error() {
        let err = DocxReader::from_bytes(b"%PDF-1.7").err().unwrap();
        assert!(matches!(err, DocOpsError::DocxError(_)));
    }

    #[test]
    fn zip_without_word_parts_is_docx_error() {
        let mut buffer = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buffer));
            zip.start_file("readme.txt", zip::write::FileOptions::default())
                .unwrap();
            zip.write_all(b"hi").unwrap();
            zip.finish().unwrap();
        }
        let err = DocxReader::from_bytes(&buffer).err().unwrap();
        assert!(matches!(err, DocOpsError::DocxError(_)));
    }
}
