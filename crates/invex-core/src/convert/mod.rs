//! Document normalization: one input file to an ordered list of payloads.

mod raster;
mod pdf;
#[cfg(feature = "pdf-render")]
mod render;
mod sheet;
mod word;

pub use raster::{decode_heif, encode_png, sniff_raster};
pub use pdf::{PageContent, PdfPages};
pub use sheet::{align_rows, xlsx_to_text};
pub(crate) use sheet::cell_text;
pub use word::{doc_to_text, docx_to_text};

use std::fs;
use std::path::Path;

use image::DynamicImage;
use tracing::{debug, error, info, warn};

use crate::error::ConvertError;
use crate::models::config::ConverterConfig;
use crate::models::payload::{DocumentFormat, NormalizedPayload, RasterKind, SourceDocument};

/// Result type for conversion operations.
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Converts source documents into payloads for the extraction service.
#[derive(Debug, Clone, Default)]
pub struct FormatConverter {
    config: ConverterConfig,
}

impl FormatConverter {
    /// Create a converter with the given settings.
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    /// Convert a file, logging and swallowing any failure.
    ///
    /// Returns an empty vector for unsupported or unreadable input.
    pub fn convert(&self, path: &Path) -> Vec<NormalizedPayload> {
        match self.try_convert(path) {
            Ok(payloads) => payloads,
            Err(ConvertError::Unsupported(format)) => {
                warn!("Skipping {}: unsupported format {}", path.display(), format);
                Vec::new()
            }
            Err(e) => {
                error!("Failed to convert {}: {}", path.display(), e);
                Vec::new()
            }
        }
    }

    /// Convert a file, returning the failure explicitly.
    ///
    /// On success the vector is never empty.
    pub fn try_convert(&self, path: &Path) -> Result<Vec<NormalizedPayload>> {
        let document = SourceDocument::new(path);
        if let DocumentFormat::Unsupported(_) = document.format {
            return Err(ConvertError::Unsupported(document.format.to_string()));
        }

        let data = fs::read(&document.path).map_err(|source| ConvertError::Read {
            path: document.path.display().to_string(),
            source,
        })?;
        info!("Converting {} ({}, {} bytes)", document.file_name(), document.format, data.len());

        let payloads = match &document.format {
            DocumentFormat::Image(kind) => self.convert_raster(&document, &data, *kind)?,
            DocumentFormat::Heif => self.convert_heif(&document, &data)?,
            DocumentFormat::Pdf => self.convert_pdf(&document, &data)?,
            DocumentFormat::Spreadsheet => text_payload(&document, xlsx_to_text(&data)?)?,
            DocumentFormat::WordDocx => text_payload(&document, docx_to_text(&data)?)?,
            DocumentFormat::WordLegacy => text_payload(&document, doc_to_text(&data)?)?,
            DocumentFormat::Unsupported(ext) => return Err(ConvertError::Unsupported(ext.clone())),
        };

        debug!("{} -> {} payload(s)", document.file_name(), payloads.len());
        Ok(payloads)
    }

    fn convert_raster(&self, document: &SourceDocument, data: &[u8], declared: RasterKind) -> Result<Vec<NormalizedPayload>> {
        let kind = sniff_raster(data, declared)?;
        Ok(vec![NormalizedPayload::image(
            document.file_name(),
            None,
            kind.media_type(),
            data,
        )])
    }

    fn convert_heif(&self, document: &SourceDocument, data: &[u8]) -> Result<Vec<NormalizedPayload>> {
        let image = decode_heif(data)?;
        let png = encode_png(&image)?;
        Ok(vec![NormalizedPayload::image(
            document.file_name(),
            None,
            RasterKind::Png.media_type(),
            &png,
        )])
    }

    fn convert_pdf(&self, document: &SourceDocument, data: &[u8]) -> Result<Vec<NormalizedPayload>> {
        let pdf = PdfPages::load(data)?;
        let mut page_count = pdf.page_count();
        if self.config.pdf_max_pages > 0 && page_count as usize > self.config.pdf_max_pages {
            warn!(
                "{} has {} pages, converting the first {}",
                document.file_name(),
                page_count,
                self.config.pdf_max_pages
            );
            page_count = self.config.pdf_max_pages as u32;
        }

        let name = document.file_name();
        let mut payloads = Vec::with_capacity(page_count as usize);
        if let Some(pages) = self.render_pdf(&name, data, page_count) {
            for (index, image) in pages {
                payloads.push(page_image(&name, index, &image)?);
            }
        } else {
            for index in 0..page_count {
                match pdf.page(index, self.config.pdf_text_fallback) {
                    Ok(PageContent::Raster(image)) => payloads.push(page_image(&name, index, &image)?),
                    Ok(PageContent::Text(text)) => payloads.push(NormalizedPayload::text(&name, Some(index), text)),
                    Ok(PageContent::Blank) => warn!("Page {} of {} has no scan or text, skipping", index + 1, name),
                    Err(e) => warn!("Page {} of {} failed: {}", index + 1, name, e),
                }
            }
        }

        if payloads.is_empty() {
            return Err(ConvertError::Empty(name));
        }
        Ok(payloads)
    }

    #[cfg(feature = "pdf-render")]
    fn render_pdf(&self, name: &str, data: &[u8], page_count: u32) -> Option<Vec<(u32, DynamicImage)>> {
        match render::render_pages(data, page_count, self.config.pdf_render_dpi) {
            Ok(pages) => Some(pages),
            Err(e) => {
                warn!("Rendering {} failed, reading page content instead: {}", name, e);
                None
            }
        }
    }

    #[cfg(not(feature = "pdf-render"))]
    fn render_pdf(&self, _name: &str, _data: &[u8], _page_count: u32) -> Option<Vec<(u32, DynamicImage)>> {
        None
    }
}

fn page_image(name: &str, index: u32, image: &DynamicImage) -> Result<NormalizedPayload> {
    let png = encode_png(image)?;
    debug!("Page {}: {}x{} raster", index + 1, image.width(), image.height());
    Ok(NormalizedPayload::image(name, Some(index), RasterKind::Png.media_type(), &png))
}

fn text_payload(document: &SourceDocument, text: String) -> Result<Vec<NormalizedPayload>> {
    if text.trim().is_empty() {
        return Err(ConvertError::Empty(document.file_name()));
    }
    Ok(vec![NormalizedPayload::text(document.file_name(), None, text)])
}
