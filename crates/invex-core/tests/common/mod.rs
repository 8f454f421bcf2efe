//! Fixture builders shared by the integration tests.
#![allow(dead_code)]

use std::path::Path;

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use serde_json::{json, Value};

/// Write a PDF whose page `i` is a single RGB image `(10 + i) x 8` pixels.
pub fn write_scanned_pdf(path: &Path, pages: u32) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();

    for i in 0..pages {
        let (width, height) = (10 + i as i64, 8i64);
        let pixels = vec![(i * 40) as u8; (width * height * 3) as usize];
        let image = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width,
                "Height" => height,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8i64,
            },
            pixels,
        );
        let image_id = doc.add_object(image);

        let content = format!("q {} 0 0 {} 0 0 cm /Im0 Do Q", width, height);
        let page_id = add_page(&mut doc, pages_id, (width, height), content, dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        });
        kids.push(Object::Reference(page_id));
    }

    save_pages(doc, pages_id, kids, path);
}

/// Write a one-page PDF whose page is a single full-page image.
///
/// `color_space` builds the image's `/ColorSpace` entry, adding any objects
/// it references to the document.
pub fn write_image_pdf(
    path: &Path,
    (width, height): (i64, i64),
    bits: i64,
    samples: Vec<u8>,
    color_space: impl FnOnce(&mut Document) -> Object,
) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let color_space = color_space(&mut doc);
    let mut image = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width,
            "Height" => height,
            "ColorSpace" => color_space,
            "BitsPerComponent" => bits,
        },
        samples,
    );
    image.compress().unwrap();
    let image_id = doc.add_object(image);

    let content = format!("q {} 0 0 {} 0 0 cm /Im0 Do Q", width, height);
    let page_id = add_page(&mut doc, pages_id, (width, height), content, dictionary! {
        "XObject" => dictionary! { "Im0" => image_id },
    });
    save_pages(doc, pages_id, vec![Object::Reference(page_id)], path);
}

/// Write an A4 page of typeset text with a small seal image in the corner.
pub fn write_text_pdf_with_seal(path: &Path, text: &str) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let seal_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 4i64,
            "Height" => 4i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8i64,
        },
        [200u8, 0, 0].repeat(16),
    ));

    let content = format!(
        "BT /F1 12 Tf 72 720 Td ({}) Tj ET q 40 0 0 40 480 700 cm /Im0 Do Q",
        text
    );
    let page_id = add_page(&mut doc, pages_id, (595, 842), content, dictionary! {
        "Font" => dictionary! { "F1" => font_id },
        "XObject" => dictionary! { "Im0" => seal_id },
    });
    save_pages(doc, pages_id, vec![Object::Reference(page_id)], path);
}

fn add_page(
    doc: &mut Document,
    pages_id: ObjectId,
    (width, height): (i64, i64),
    content: String,
    resources: Dictionary,
) -> ObjectId {
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
    doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "MediaBox" => Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(width),
            Object::Integer(height),
        ]),
        "Resources" => resources,
    })
}

fn save_pages(mut doc: Document, pages_id: ObjectId, kids: Vec<Object>, path: &Path) {
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

/// Write a one-sheet workbook with a partner and a total.
pub fn write_invoice_xlsx(path: &Path) {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "請求先").unwrap();
    sheet.write_string(0, 1, "ABC商事 御中").unwrap();
    sheet.write_string(1, 0, "合計").unwrap();
    sheet.write_number(1, 1, 12000.0).unwrap();
    workbook.save(path).unwrap();
}

/// Chat completion envelope carrying `content` as the assistant message.
pub fn chat_response(content: &str) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}
