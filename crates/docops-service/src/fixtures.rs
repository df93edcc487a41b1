// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Test inputs generated in code. Pages are told apart by MediaBox width.

use std::io::Cursor;

use docops_core::{Document, DocumentFormat};
use image::{DynamicImage, ImageFormat, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Object, Stream};

/// A PDF with one page per entry, each `(width, text)`.
pub fn pdf(name: &str, pages: &[(i64, &str)]) -> Document {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(b"Courier".to_vec()));
    let font_id = doc.add_object(Object::Dictionary(font));
    let mut fonts = Dictionary::new();
    fonts.set("F1", Object::Reference(font_id));
    let mut resources = Dictionary::new();
    resources.set("Font", Object::Dictionary(fonts));

    let mut kids = Vec::new();
    for (width, text) in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(18)]),
                Operation::new("Td", vec![Object::Integer(10), Object::Integer(100)]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));

        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(pages_id));
        page.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(*width),
                Object::Integer(200),
            ]),
        );
        page.set("Resources", Object::Dictionary(resources.clone()));
        page.set("Contents", Object::Reference(content_id));
        kids.push(Object::Reference(doc.add_object(Object::Dictionary(page))));
    }

    let mut tree = Dictionary::new();
    tree.set("Type", Object::Name(b"Pages".to_vec()));
    tree.set("Count", Object::Integer(kids.len() as i64));
    tree.set("Kids", Object::Array(kids));
    doc.objects.insert(pages_id, Object::Dictionary(tree));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(Object::Dictionary(catalog));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    Document::new(name, DocumentFormat::Pdf, bytes)
}

/// MediaBox (width, height) of every page, in page order.
pub fn page_sizes(bytes: &[u8]) -> Vec<(f32, f32)> {
    let doc = lopdf::Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .values()
        .map(|&id| {
            let page = doc.get_object(id).unwrap().as_dict().unwrap();
            let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
            let n = |o: &Object| match o {
                Object::Integer(i) => *i as f32,
                Object::Real(r) => *r as f32,
                other => panic!("not a number: {other:?}"),
            };
            (n(&media_box[2]) - n(&media_box[0]), n(&media_box[3]) - n(&media_box[1]))
        })
        .collect()
}

pub fn page_widths(bytes: &[u8]) -> Vec<f32> {
    page_sizes(bytes).into_iter().map(|(w, _)| w).collect()
}

/// A solid-colour image encoded in `format`.
pub fn encoded_image(name: &str, width: u32, height: u32, format: DocumentFormat) -> Document {
    let encoding = match format {
        DocumentFormat::Png => ImageFormat::Png,
        DocumentFormat::Jpeg => ImageFormat::Jpeg,
        other => panic!("not an image format: {other}"),
    };
    let pixels = RgbImage::from_pixel(width, height, image::Rgb([40, 120, 200]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(pixels)
        .write_to(&mut Cursor::new(&mut bytes), encoding)
        .unwrap();
    Document::new(name, format, bytes)
}
