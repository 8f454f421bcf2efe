//! Page content from PDFs using lopdf.
//!
//! A scanned page is one image XObject drawn over the whole page. The page's
//! content stream is walked to find where each image lands, and only an image
//! covering the media box with no text on the page counts as the page raster.
//! Anything else is a text page (or blank without a text layer).

use image::{DynamicImage, ImageBuffer, Luma, Rgb};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, trace};

use super::Result;
use crate::error::ConvertError;

/// Fraction of the media box an image must cover to be the page scan.
const FULL_PAGE_COVERAGE: f32 = 0.9;

type Matrix = [f32; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Content recovered from one PDF page.
#[derive(Debug)]
pub enum PageContent {
    /// The page's scanned raster.
    Raster(DynamicImage),
    /// Embedded text, for pages that are not a full-page scan.
    Text(String),
    /// Nothing usable on this page.
    Blank,
}

/// Image colour spaces that can be expanded to 8-bit gray or RGB.
#[derive(Debug, Clone, PartialEq)]
enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
    Indexed { base: Box<ColorSpace>, lookup: Vec<u8> },
}

impl ColorSpace {
    fn components(&self) -> usize {
        match self {
            ColorSpace::Gray | ColorSpace::Indexed { .. } => 1,
            ColorSpace::Rgb => 3,
            ColorSpace::Cmyk => 4,
        }
    }
}

/// A loaded PDF document.
pub struct PdfPages {
    document: Document,
}

impl PdfPages {
    /// Load a PDF from bytes, decrypting empty-password documents.
    pub fn load(data: &[u8]) -> Result<Self> {
        let mut document = Document::load_mem(data).map_err(|e| ConvertError::Pdf(e.to_string()))?;

        if document.is_encrypted() {
            if document.decrypt("").is_err() {
                return Err(ConvertError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");
        }

        if document.get_pages().is_empty() {
            return Err(ConvertError::NoPages);
        }

        debug!("Loaded PDF with {} pages", document.get_pages().len());
        Ok(Self { document })
    }

    /// Number of pages.
    pub fn page_count(&self) -> u32 {
        self.document.get_pages().len() as u32
    }

    /// Content of a 0-based page.
    ///
    /// A full-page scan without text is a raster. A page with text is text
    /// when `text_fallback` is set. An OCR'd scan with `text_fallback` off
    /// falls back to its raster.
    pub fn page(&self, index: u32, text_fallback: bool) -> Result<PageContent> {
        // lopdf numbers pages from 1
        let number = index + 1;
        let pages = self.document.get_pages();
        let page_id = *pages
            .get(&number)
            .ok_or_else(|| ConvertError::Pdf(format!("invalid page number: {}", number)))?;

        let text = self.page_text(number);
        let scan = self.page_scan(page_id);

        Ok(match (scan, text) {
            (Some(image), None) => PageContent::Raster(image),
            (_, Some(text)) if text_fallback => {
                debug!("Page {} has a text layer, using {} chars of text", number, text.len());
                PageContent::Text(text)
            }
            (Some(image), Some(_)) => PageContent::Raster(image),
            (None, _) => PageContent::Blank,
        })
    }

    fn page_text(&self, number: u32) -> Option<String> {
        let text = self.document.extract_text(&[number]).unwrap_or_default();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }

    /// The decodable image drawn over the page's whole media box, if any.
    fn page_scan(&self, page_id: ObjectId) -> Option<DynamicImage> {
        let page_area = self.media_box_area(page_id)?;
        let resources = self.page_resources(page_id)?;
        let xobjects = resources
            .get(b"XObject")
            .ok()
            .and_then(|o| self.document.dereference(o).ok())
            .and_then(|(_, o)| o.as_dict().ok())?;

        let content = self.document.get_page_content(page_id).ok()?;
        let operations = Content::decode(&content).ok()?.operations;

        let mut drawn = drawn_xobjects(&operations);
        drawn.sort_by(|a, b| b.1.total_cmp(&a.1));

        drawn
            .into_iter()
            .filter(|(name, area)| {
                let coverage = area / page_area;
                trace!("/{} covers {:.2} of the page", String::from_utf8_lossy(name), coverage);
                coverage >= FULL_PAGE_COVERAGE
            })
            .find_map(|(name, _)| {
                let (_, obj) = self.document.dereference(xobjects.get(&name).ok()?).ok()?;
                self.decode_image(obj)
            })
    }

    fn decode_image(&self, obj: &Object) -> Option<DynamicImage> {
        let Object::Stream(stream) = obj else {
            return None;
        };
        let dict = &stream.dict;

        if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
            return None;
        }
        if matches!(dict.get(b"ImageMask"), Ok(Object::Boolean(true))) {
            return None;
        }

        let width = dict.get(b"Width").ok()?.as_i64().ok()? as u32;
        let height = dict.get(b"Height").ok()?.as_i64().ok()? as u32;
        trace!("Found image object: {}x{}", width, height);

        if let Ok(filter) = dict.get(b"Filter") {
            let filter_name = match filter {
                Object::Name(name) => Some(name.as_slice()),
                Object::Array(arr) => arr.last().and_then(|o| o.as_name().ok()),
                _ => None,
            };

            match filter_name {
                Some(b"DCTDecode") => {
                    return image::load_from_memory_with_format(&stream.content, image::ImageFormat::Jpeg).ok();
                }
                Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                    trace!("Skipping image with unsupported filter");
                    return None;
                }
                _ => {}
            }
        }

        let data = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());

        let color_space = match dict.get(b"ColorSpace") {
            Ok(obj) => self.resolve_color_space(obj)?,
            Err(_) => ColorSpace::Rgb,
        };

        let bits = dict
            .get(b"BitsPerComponent")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(8);

        raw_to_image(&data, width, height, &color_space, bits)
    }

    fn resolve_color_space(&self, obj: &Object) -> Option<ColorSpace> {
        match obj {
            Object::Reference(id) => self.resolve_color_space(self.document.get_object(*id).ok()?),
            Object::Name(name) => device_color_space(name),
            Object::Array(items) => {
                let family = items.first()?.as_name().ok()?;
                match family {
                    b"ICCBased" => {
                        let (_, profile) = self.document.dereference(items.get(1)?).ok()?;
                        let profile = &profile.as_stream().ok()?.dict;
                        match profile.get(b"N").and_then(Object::as_i64) {
                            Ok(1) => Some(ColorSpace::Gray),
                            Ok(3) => Some(ColorSpace::Rgb),
                            Ok(4) => Some(ColorSpace::Cmyk),
                            _ => self.resolve_color_space(profile.get(b"Alternate").ok()?),
                        }
                    }
                    b"Indexed" | b"I" => {
                        let base = self.resolve_color_space(items.get(1)?)?;
                        if matches!(base, ColorSpace::Indexed { .. }) {
                            return None;
                        }
                        let (_, lookup) = self.document.dereference(items.get(3)?).ok()?;
                        let lookup = match lookup {
                            Object::String(bytes, _) => bytes.clone(),
                            Object::Stream(stream) => stream
                                .decompressed_content()
                                .unwrap_or_else(|_| stream.content.clone()),
                            _ => return None,
                        };
                        Some(ColorSpace::Indexed {
                            base: Box::new(base),
                            lookup,
                        })
                    }
                    b"CalRGB" => Some(ColorSpace::Rgb),
                    b"CalGray" => Some(ColorSpace::Gray),
                    other => device_color_space(other),
                }
            }
            _ => None,
        }
    }

    /// Area of the page's media box, following `Parent` inheritance.
    fn media_box_area(&self, node_id: ObjectId) -> Option<f32> {
        let dict = self.document.get_dictionary(node_id).ok()?;

        if let Ok(media_box) = dict.get(b"MediaBox") {
            let (_, media_box) = self.document.dereference(media_box).ok()?;
            let corners: Vec<f32> = media_box
                .as_array()
                .ok()?
                .iter()
                .filter_map(|o| o.as_float().ok())
                .collect();
            let [x1, y1, x2, y2] = corners[..] else {
                return None;
            };
            let area = ((x2 - x1) * (y2 - y1)).abs();
            return (area > 0.0).then_some(area);
        }

        match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => self.media_box_area(*parent_id),
            _ => None,
        }
    }

    /// Resources dictionary for a page, following `Parent` inheritance.
    fn page_resources(&self, node_id: ObjectId) -> Option<Dictionary> {
        let Object::Dictionary(dict) = self.document.get_object(node_id).ok()? else {
            return None;
        };

        if let Ok(resources) = dict.get(b"Resources") {
            if let Ok((_, Object::Dictionary(res_dict))) = self.document.dereference(resources) {
                return Some(res_dict.clone());
            }
        }

        match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => self.page_resources(*parent_id),
            _ => None,
        }
    }
}

fn device_color_space(name: &[u8]) -> Option<ColorSpace> {
    match name {
        b"DeviceGray" | b"G" | b"CalGray" => Some(ColorSpace::Gray),
        b"DeviceRGB" | b"RGB" | b"CalRGB" => Some(ColorSpace::Rgb),
        b"DeviceCMYK" | b"CMYK" => Some(ColorSpace::Cmyk),
        _ => {
            trace!("Unsupported colour space {:?}", String::from_utf8_lossy(name));
            None
        }
    }
}

/// XObjects painted by `Do`, with the page-space area each one covers.
fn drawn_xobjects(operations: &[Operation]) -> Vec<(Vec<u8>, f32)> {
    let mut ctm = IDENTITY;
    let mut saved = Vec::new();
    let mut drawn = Vec::new();

    for op in operations {
        match op.operator.as_str() {
            "q" => saved.push(ctm),
            "Q" => {
                if let Some(previous) = saved.pop() {
                    ctm = previous;
                }
            }
            "cm" => {
                if let Some(matrix) = operand_matrix(&op.operands) {
                    ctm = multiply(&matrix, &ctm);
                }
            }
            "Do" => {
                if let Some(Ok(name)) = op.operands.first().map(Object::as_name) {
                    // images are drawn into the unit square
                    let area = (ctm[0] * ctm[3] - ctm[1] * ctm[2]).abs();
                    drawn.push((name.to_vec(), area));
                }
            }
            _ => {}
        }
    }

    drawn
}

fn operand_matrix(operands: &[Object]) -> Option<Matrix> {
    let values: Vec<f32> = operands.iter().filter_map(|o| o.as_float().ok()).collect();
    values.try_into().ok()
}

/// `m` applied first, then `n`.
fn multiply(m: &Matrix, n: &Matrix) -> Matrix {
    [
        m[0] * n[0] + m[1] * n[2],
        m[0] * n[1] + m[1] * n[3],
        m[2] * n[0] + m[3] * n[2],
        m[2] * n[1] + m[3] * n[3],
        m[4] * n[0] + m[5] * n[2] + n[4],
        m[4] * n[1] + m[5] * n[3] + n[5],
    ]
}

/// Build an 8-bit gray or RGB image from uncompressed samples.
fn raw_to_image(data: &[u8], width: u32, height: u32, color_space: &ColorSpace, bits: i64) -> Option<DynamicImage> {
    let bits = u8::try_from(bits).ok()?;
    if width == 0 || height == 0 {
        return None;
    }

    let Some(samples) = unpack_samples(data, width as usize, height as usize, color_space.components(), bits) else {
        trace!(
            "Could not decode image: colorspace={:?}, bits={}, data_len={}",
            color_space,
            bits,
            data.len()
        );
        return None;
    };

    let samples = match color_space {
        ColorSpace::Indexed { .. } => samples,
        _ => scale_to_8_bit(samples, bits),
    };
    samples_to_image(color_space, width, height, samples)
}

fn samples_to_image(color_space: &ColorSpace, width: u32, height: u32, samples: Vec<u8>) -> Option<DynamicImage> {
    match color_space {
        ColorSpace::Gray => ImageBuffer::<Luma<u8>, _>::from_raw(width, height, samples).map(DynamicImage::ImageLuma8),
        ColorSpace::Rgb => ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, samples).map(DynamicImage::ImageRgb8),
        ColorSpace::Cmyk => {
            let rgb = samples.chunks_exact(4).flat_map(cmyk_to_rgb).collect();
            ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, rgb).map(DynamicImage::ImageRgb8)
        }
        ColorSpace::Indexed { base, lookup } => {
            let n = base.components();
            let mut expanded = Vec::with_capacity(samples.len() * n);
            for index in samples {
                let start = usize::from(index) * n;
                match lookup.get(start..start + n) {
                    Some(entry) => expanded.extend_from_slice(entry),
                    None => expanded.extend(std::iter::repeat_n(0, n)),
                }
            }
            samples_to_image(base, width, height, expanded)
        }
    }
}

/// One byte per sample, rows padded to whole bytes.
fn unpack_samples(data: &[u8], width: usize, height: usize, components: usize, bits: u8) -> Option<Vec<u8>> {
    let per_row = width * components;
    let row_bytes = (per_row * usize::from(bits)).div_ceil(8);
    if row_bytes == 0 || data.len() < row_bytes * height {
        return None;
    }

    let mut samples = Vec::with_capacity(per_row * height);
    for row in data.chunks(row_bytes).take(height) {
        match bits {
            8 => samples.extend_from_slice(&row[..per_row]),
            16 => samples.extend(row.chunks_exact(2).take(per_row).map(|pair| pair[0])),
            1 | 2 | 4 => {
                let mask = (1u8 << bits) - 1;
                for i in 0..per_row {
                    let bit = i * usize::from(bits);
                    let shift = 8 - usize::from(bits) - bit % 8;
                    samples.push((row[bit / 8] >> shift) & mask);
                }
            }
            _ => return None,
        }
    }
    Some(samples)
}

fn scale_to_8_bit(samples: Vec<u8>, bits: u8) -> Vec<u8> {
    if bits >= 8 {
        return samples;
    }
    let max = u16::from((1u8 << bits) - 1);
    samples
        .into_iter()
        .map(|v| (u16::from(v) * 255 / max) as u8)
        .collect()
}

fn cmyk_to_rgb(cmyk: &[u8]) -> [u8; 3] {
    let k = 255 - u16::from(cmyk[3]);
    let channel = |c: u8| ((255 - u16::from(c)) * k / 255) as u8;
    [channel(cmyk[0]), channel(cmyk[1]), channel(cmyk[2])]
}
