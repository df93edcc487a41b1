// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — open, inspect, extract, and concatenate existing PDF documents
// using the `lopdf` crate.

use std::collections::BTreeMap;

use docops_core::error::{DocOpsError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info, instrument, warn};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Upper bound on page-tree depth when resolving inherited attributes.
const MAX_TREE_DEPTH: usize = 64;

/// Page model over an existing PDF.
///
/// Wraps `lopdf::Document` and provides the operations the document service
/// needs: page count, single-page extraction, text extraction, and
/// concatenation of several documents.
pub struct PdfReader {
    /// The underlying lopdf document.
    document: Document,
    /// Page object ids keyed by 1-based page number.
    pages: BTreeMap<u32, ObjectId>,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Create a reader from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            DocOpsError::PdfError(format!("failed to load PDF from memory: {}", err))
        })?;
        let pages = document.get_pages();

        debug!(pages = pages.len(), "PDF loaded from bytes");

        Ok(Self { document, pages })
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Extract the text of one page (1-indexed).
    pub fn page_text(&self, page_number: u32) -> Result<String> {
        self.page_id(page_number)?;
        self.document.extract_text(&[page_number]).map_err(|err| {
            DocOpsError::PdfError(format!("text extraction failed on page {}: {}", page_number, err))
        })
    }

    // -- Extraction -----------------------------------------------------------

    /// Extract a single page (1-indexed) into a new standalone PDF document.
    ///
    /// Returns the serialised bytes of the single-page PDF.
    #[instrument(skip(self))]
    pub fn extract_page(&self, page_number: u32) -> Result<Vec<u8>> {
        let page_id = self.page_id(page_number)?;

        let mut builder = PageTreeBuilder::new();
        builder.import(&self.document, &[page_id])?;
        let output = builder.finish()?;

        debug!(page_number, output_bytes = output.len(), "Page extracted");
        Ok(output)
    }

    /// Concatenate several PDFs, producing a combined PDF. Pages appear in
    /// input order, each input keeping its own page order.
    #[instrument(skip_all, fields(documents = readers.len()))]
    pub fn concatenate(readers: &[PdfReader]) -> Result<Vec<u8>> {
        info!(
            total_pages = readers.iter().map(PdfReader::page_count).sum::<u32>(),
            "Merging PDFs"
        );

        let mut builder = PageTreeBuilder::new();
        for reader in readers {
            let page_ids: Vec<ObjectId> = reader.pages.values().copied().collect();
            builder.import(&reader.document, &page_ids)?;
        }
        let output = builder.finish()?;

        debug!(output_bytes = output.len(), "Merge complete");
        Ok(output)
    }

    // -- Helpers --------------------------------------------------------------

    fn page_id(&self, page_number: u32) -> Result<ObjectId> {
        self.pages
            .get(&page_number)
            .copied()
            .ok_or(DocOpsError::PageOutOfRange {
                page: page_number,
                count: self.page_count(),
            })
    }
}

/// Builds a fresh document with a flat page tree from pages of other documents.
struct PageTreeBuilder {
    target: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
}

impl PageTreeBuilder {
    fn new() -> Self {
        let mut target = Document::with_version("1.5");
        let pages_id = target.new_object_id();

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = target.add_object(Object::Dictionary(catalog));
        target.trailer.set("Root", Object::Reference(catalog_id));

        Self {
            target,
            pages_id,
            kids: Vec::new(),
        }
    }

    /// Append the given pages of `source`, in order.
    ///
    /// Objects shared between those pages are copied once.
    fn import(&mut self, source: &Document, page_ids: &[ObjectId]) -> Result<()> {
        let mut cloner = ObjectCloner::new(source);
        for &page_id in page_ids {
            let new_id = cloner.clone_page(&mut self.target, page_id, self.pages_id)?;
            self.kids.push(Object::Reference(new_id));
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<u8>> {
        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Count", Object::Integer(self.kids.len() as i64));
        pages.set("Kids", Object::Array(self.kids));
        self.target
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let mut output = Vec::new();
        self.target.save_to(&mut output).map_err(|err| {
            DocOpsError::PdfError(format!("failed to serialise PDF: {}", err))
        })?;
        Ok(output)
    }
}

/// Deep-copies objects from one document into another, remembering every
/// source id it has already copied so shared and cyclic references resolve
/// to a single target object.
struct ObjectCloner<'a> {
    source: &'a Document,
    copied: BTreeMap<ObjectId, ObjectId>,
}

impl<'a> ObjectCloner<'a> {
    fn new(source: &'a Document) -> Self {
        Self {
            source,
            copied: BTreeMap::new(),
        }
    }

    /// Copy a page dictionary, folding in inherited attributes and pointing
    /// its /Parent at `parent_id`.
    fn clone_page(
        &mut self,
        target: &mut Document,
        page_id: ObjectId,
        parent_id: ObjectId,
    ) -> Result<ObjectId> {
        let mut page = self
            .source
            .get_object(page_id)
            .and_then(Object::as_dict)
            .map_err(|err| {
                DocOpsError::PdfError(format!("cannot read page object {:?}: {}", page_id, err))
            })?
            .clone();

        for key in INHERITABLE {
            if !page.has(key)
                && let Some(value) = self.inherited(&page, key)
            {
                page.set(key.to_vec(), value);
            }
        }

        let new_id = target.new_object_id();
        self.copied.insert(page_id, new_id);

        let mut cloned = self.clone_dictionary(target, &page);
        cloned.set("Parent", Object::Reference(parent_id));
        target.objects.insert(new_id, Object::Dictionary(cloned));

        Ok(new_id)
    }

    /// Walk /Parent links looking for an inheritable attribute.
    fn inherited(&self, page: &Dictionary, key: &[u8]) -> Option<Object> {
        let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
        for _ in 0..MAX_TREE_DEPTH {
            let node = self.source.get_object(parent?).and_then(Object::as_dict).ok()?;
            if let Ok(value) = node.get(key) {
                return Some(value.clone());
            }
            parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        }
        None
    }

    fn clone_reference(&mut self, target: &mut Document, id: ObjectId) -> ObjectId {
        if let Some(&existing) = self.copied.get(&id) {
            return existing;
        }
        let new_id = target.new_object_id();
        self.copied.insert(id, new_id);

        let cloned = match self.source.get_object(id) {
            Ok(object) => self.clone_object(target, object),
            Err(err) => {
                warn!(?id, %err, "Cannot resolve reference, using Null");
                Object::Null
            }
        };
        target.objects.insert(new_id, cloned);
        new_id
    }

    fn clone_object(&mut self, target: &mut Document, object: &Object) -> Object {
        match object {
            Object::Dictionary(dict) => Object::Dictionary(self.clone_dictionary(target, dict)),
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.clone_object(target, item))
                    .collect(),
            ),
            Object::Reference(id) => Object::Reference(self.clone_reference(target, *id)),
            Object::Stream(stream) => {
                let dict = self.clone_dictionary(target, &stream.dict);
                let mut cloned = Stream::new(dict, stream.content.clone());
                cloned.allows_compression = stream.allows_compression;
                Object::Stream(cloned)
            }
            other => other.clone(),
        }
    }

    /// Copy a dictionary, dropping /Parent so the source page tree is not
    /// dragged along; callers re-link pages explicitly.
    fn clone_dictionary(&mut self, target: &mut Document, dict: &Dictionary) -> Dictionary {
        let mut cloned = Dictionary::new();
        for (key, value) in dict.iter() {
            if key == b"Parent" {
                continue;
            }
            cloned.set(key.clone(), self.clone_object(target, value));
        }
        cloned
    }
}
