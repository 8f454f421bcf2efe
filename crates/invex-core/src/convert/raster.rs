//! Raster and HEIF image handling.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat};
use tracing::debug;

use super::Result;
use crate::error::ConvertError;
use crate::models::payload::RasterKind;

/// Check that `data` really is an image before passing it through unchanged.
///
/// JPEG and PNG are sent to the model as-is; a mismatched extension is fine
/// as long as the bytes hold a PNG or JPEG, and the returned kind follows
/// the bytes rather than the file name.
pub fn sniff_raster(data: &[u8], declared: RasterKind) -> Result<RasterKind> {
    match image::guess_format(data)? {
        ImageFormat::Png => Ok(RasterKind::Png),
        ImageFormat::Jpeg => Ok(RasterKind::Jpeg),
        other => {
            debug!("Declared {:?} but content is {:?}", declared, other);
            Err(ConvertError::NotAnImage(format!("{:?} content", other)))
        }
    }
}

/// Lossless PNG encoding of a decoded image.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    image.write_to(&mut Cursor::new(&mut data), ImageFormat::Png)?;
    Ok(data)
}

/// Decode the primary image of a HEIF/HEIC container.
#[cfg(feature = "heif")]
pub fn decode_heif(data: &[u8]) -> Result<DynamicImage> {
    use image::{ImageBuffer, Rgba};
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    let lib_heif = LibHeif::new();
    let context = HeifContext::read_from_bytes(data).map_err(|e| ConvertError::Heif(e.to_string()))?;
    let handle = context
        .primary_image_handle()
        .map_err(|e| ConvertError::Heif(e.to_string()))?;
    let decoded = lib_heif
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgba), None)
        .map_err(|e| ConvertError::Heif(e.to_string()))?;

    let planes = decoded.planes();
    let plane = planes
        .interleaved
        .ok_or_else(|| ConvertError::Heif("no interleaved plane".to_string()))?;

    let (width, height, stride) = (plane.width, plane.height, plane.stride);
    let row_bytes = width as usize * 4;
    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in plane.data.chunks(stride).take(height as usize) {
        pixels.extend_from_slice(&row[..row_bytes]);
    }

    ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, pixels)
        .map(DynamicImage::ImageRgba8)
        .ok_or_else(|| ConvertError::Heif("pixel buffer size mismatch".to_string()))
}

/// Decode the primary image of a HEIF/HEIC container.
#[cfg(not(feature = "heif"))]
pub fn decode_heif(_data: &[u8]) -> Result<DynamicImage> {
    Err(ConvertError::Heif(
        "HEIF support not compiled in (enable the `heif` feature)".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn tiny_png() -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(3, 2, Rgb([200, 10, 10])));
        encode_png(&img).unwrap()
    }

    #[test]
    fn test_sniff_follows_content() {
        let png = tiny_png();
        assert_eq!(sniff_raster(&png, RasterKind::Png).unwrap(), RasterKind::Png);
        assert_eq!(sniff_raster(&png, RasterKind::Jpeg).unwrap(), RasterKind::Png);
    }

    #[test]
    fn test_sniff_rejects_non_images() {
        assert!(sniff_raster(b"plain text, not an image", RasterKind::Jpeg).is_err());
    }

    #[test]
    fn test_encode_png_is_decodable() {
        let png = tiny_png();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (3, 2));
    }

    #[cfg(not(feature = "heif"))]
    #[test]
    fn test_heif_without_feature_fails_explicitly() {
        assert!(matches!(decode_heif(b"...."), Err(ConvertError::Heif(_))));
    }
}
