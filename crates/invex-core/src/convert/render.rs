//! Full page rendering through pdfium.

use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::{debug, warn};

use super::Result;
use crate::error::ConvertError;

/// Render the first `page_count` pages at `dpi`, skipping pages that fail.
///
/// Returns `(0-based page index, image)` pairs in page order.
pub fn render_pages(data: &[u8], page_count: u32, dpi: u32) -> Result<Vec<(u32, DynamicImage)>> {
    let bindings = Pdfium::bind_to_system_library()
        .or_else(|_| Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./")))
        .map_err(|e| ConvertError::Render(format!("failed to bind pdfium library: {e}")))?;
    let pdfium = Pdfium::new(bindings);

    let document = pdfium
        .load_pdf_from_byte_slice(data, None)
        .map_err(|e| ConvertError::Render(e.to_string()))?;

    let config = PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / 72.0);
    let mut images = Vec::with_capacity(page_count as usize);
    for (index, page) in document.pages().iter().take(page_count as usize).enumerate() {
        match page.render_with_config(&config) {
            Ok(bitmap) => {
                let image = bitmap.as_image();
                debug!("Rendered page {} at {}x{}", index + 1, image.width(), image.height());
                images.push((index as u32, image));
            }
            Err(e) => warn!("Failed to render page {}: {}", index + 1, e),
        }
    }

    Ok(images)
}
