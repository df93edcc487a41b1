// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The five document operations. Each validates its inputs, then delegates to
// the capabilities in `docops-document`.

use docops_core::error::{DocOpsError, Result};
use docops_core::{
    CancelToken, Document, DocumentFormat, OperationKind, OperationOutput, OperationRequest,
    PageSelection, ServiceConfig, SplitMode,
};
use docops_document::backend;
use docops_document::{
    ImageProcessor, PdfReader, PdfToWordConverter, PdfWriter, TextPdfToWord, renderer_for,
};
use tracing::{debug, info, instrument};

use crate::scratch::ScratchSpace;

/// Run one request to completion, stopping early once `cancel` fires.
pub(crate) fn dispatch(
    config: &ServiceConfig,
    request: &OperationRequest,
    cancel: &CancelToken,
) -> Result<OperationOutput> {
    match request.kind {
        OperationKind::PdfToWord => pdf_to_word(request),
        OperationKind::WordToPdf => word_to_pdf(config, request, cancel),
        OperationKind::ImagesToPdf => images_to_pdf(request, cancel),
        OperationKind::SplitPdf => split_pdf(config, request, cancel),
        OperationKind::MergePdf => merge_pdf(request, cancel),
    }
}

#[instrument(skip_all)]
fn pdf_to_word(request: &OperationRequest) -> Result<OperationOutput> {
    let input = single_input(request, DocumentFormat::Pdf)?;
    let name = request.output_file_name(DocumentFormat::Docx)?;
    let docx = TextPdfToWord
        .convert(input.bytes(), request.options.page_range)
        .map_err(|err| name_input(input, err))?;
    Ok(OperationOutput::Single(Document::new(name, DocumentFormat::Docx, docx)))
}

#[instrument(skip_all)]
fn word_to_pdf(
    config: &ServiceConfig,
    request: &OperationRequest,
    cancel: &CancelToken,
) -> Result<OperationOutput> {
    let input = single_input(request, DocumentFormat::Docx)?;
    let name = request.output_file_name(DocumentFormat::Pdf)?;
    let engine = request
        .options
        .render_engine
        .unwrap_or(config.default_render_engine);

    if let Some(backend_config) = config.backend(engine) {
        backend::ensure_available(engine, backend_config, config.auto_provision, cancel)?;
    }

    let scratch = ScratchSpace::create(config.scratch_dir.as_deref())?;
    let renderer = renderer_for(engine, config, request.options.pdf_engine.clone());
    info!(%engine, "Rendering DOCX to PDF");
    let pdf = renderer
        .render(input.bytes(), scratch.path(), cancel)
        .map_err(|err| name_input(input, err))?;

    Ok(OperationOutput::Single(Document::new(name, DocumentFormat::Pdf, pdf)))
}

#[instrument(skip_all, fields(images = request.inputs.len()))]
fn images_to_pdf(request: &OperationRequest, cancel: &CancelToken) -> Result<OperationOutput> {
    if request.inputs.is_empty() {
        return Err(DocOpsError::Validation(
            "images-to-pdf needs at least one image".into(),
        ));
    }
    let name = request.output_file_name(DocumentFormat::Pdf)?;

    let mut images = Vec::with_capacity(request.inputs.len());
    for input in &request.inputs {
        cancel.check()?;
        if !input.format().is_image() {
            return Err(DocOpsError::Validation(format!(
                "{} is not a JPEG or PNG image",
                input.name()
            )));
        }
        let processor = ImageProcessor::from_bytes(input.name(), input.format(), input.bytes())?;
        debug!(
            name = input.name(),
            width = processor.width(),
            height = processor.height(),
            "Image accepted"
        );
        images.push(processor.normalize());
    }

    let pdf = PdfWriter::a4().create_from_images(images)?;
    Ok(OperationOutput::Single(Document::new(name, DocumentFormat::Pdf, pdf)))
}

#[instrument(skip_all)]
fn split_pdf(
    config: &ServiceConfig,
    request: &OperationRequest,
    cancel: &CancelToken,
) -> Result<OperationOutput> {
    let input = single_input(request, DocumentFormat::Pdf)?;
    let reader = PdfReader::from_bytes(input.bytes()).map_err(|err| name_input(input, err))?;
    let page_count = reader.page_count();
    if page_count == 0 {
        return Err(DocOpsError::PdfError(format!("{}: PDF has no pages", input.name())));
    }

    let pages: Vec<u32> = match &request.options.split {
        SplitMode::All => (1..=page_count).collect(),
        SplitMode::Pages(selection) => selected(selection, page_count)?,
        SplitMode::Expression(expression) => {
            let selection = PageSelection::parse(expression, config.selection_policy)?;
            selected(&selection, page_count)?
        }
    };

    let mut outputs = Vec::with_capacity(pages.len());
    for page in pages {
        cancel.check()?;
        let bytes = reader
            .extract_page(page)
            .map_err(|err| name_input(input, err))?;
        outputs.push(Document::new(
            format!("page_{page}.pdf"),
            DocumentFormat::Pdf,
            bytes,
        ));
    }

    info!(page_count, outputs = outputs.len(), "PDF split");
    Ok(OperationOutput::Many(outputs))
}

fn selected(selection: &PageSelection, page_count: u32) -> Result<Vec<u32>> {
    selection.validate(page_count)?;
    Ok(selection.pages().to_vec())
}

#[instrument(skip_all, fields(documents = request.inputs.len()))]
fn merge_pdf(request: &OperationRequest, cancel: &CancelToken) -> Result<OperationOutput> {
    if request.inputs.len() < 2 {
        return Err(DocOpsError::Validation(format!(
            "merge-pdf needs at least two PDFs, got {}",
            request.inputs.len()
        )));
    }

    let name = request.output_file_name(DocumentFormat::Pdf)?;

    let mut readers = Vec::with_capacity(request.inputs.len());
    for input in &request.inputs {
        cancel.check()?;
        require_format(input, DocumentFormat::Pdf)?;
        let reader = PdfReader::from_bytes(input.bytes()).map_err(|err| name_input(input, err))?;
        if reader.page_count() == 0 {
            return Err(DocOpsError::PdfError(format!("{}: PDF has no pages", input.name())));
        }
        readers.push(reader);
    }

    let merged = PdfReader::concatenate(&readers)?;
    Ok(OperationOutput::Single(Document::new(name, DocumentFormat::Pdf, merged)))
}

/// Page count of a single PDF, for `docops info`.
#[instrument(skip_all, fields(document = document.name()))]
pub(crate) fn page_count(document: &Document) -> Result<u32> {
    require_format(document, DocumentFormat::Pdf)?;
    let reader =
        PdfReader::from_bytes(document.bytes()).map_err(|err| name_input(document, err))?;
    Ok(reader.page_count())
}

// -- Input checks -------------------------------------------------------------

fn single_input(request: &OperationRequest, format: DocumentFormat) -> Result<&Document> {
    match request.inputs.as_slice() {
        [input] => {
            require_format(input, format)?;
            Ok(input)
        }
        inputs => Err(DocOpsError::Validation(format!(
            "{} takes exactly one {} input, got {}",
            request.kind,
            format.extension().to_uppercase(),
            inputs.len()
        ))),
    }
}

fn require_format(input: &Document, format: DocumentFormat) -> Result<()> {
    if input.format() == format {
        Ok(())
    } else {
        Err(DocOpsError::Validation(format!(
            "{} is a {} file, expected {}",
            input.name(),
            input.format().extension().to_uppercase(),
            format.extension().to_uppercase()
        )))
    }
}

/// Prefix parse failures with the offending input's name.
fn name_input(input: &Document, err: DocOpsError) -> DocOpsError {
    match err {
        DocOpsError::PdfError(detail) => DocOpsError::PdfError(format!("{}: {detail}", input.name())),
        DocOpsError::DocxError(detail) => {
            DocOpsError::DocxError(format!("{}: {detail}", input.name()))
        }
        other => other,
    }
}
