//! Source documents and the normalized payloads derived from them.

use std::fmt;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// Raster image flavours accepted as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterKind {
    Png,
    Jpeg,
}

impl RasterKind {
    /// MIME type sent alongside the image bytes.
    pub fn media_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

/// Input format, decided from the file extension alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentFormat {
    /// `.png`, `.jpg`, `.jpeg`.
    Image(RasterKind),
    /// `.heif`, `.heic`.
    Heif,
    /// `.pdf`, treated as a multi-page scan.
    Pdf,
    /// `.xlsx`.
    Spreadsheet,
    /// `.docx`.
    WordDocx,
    /// `.doc` (Word 97-2003).
    WordLegacy,
    /// Anything else; carries the lowercased extension (may be empty).
    Unsupported(String),
}

impl DocumentFormat {
    /// Extensions the converter recognizes.
    pub const SUPPORTED_EXTENSIONS: [&'static str; 9] =
        ["png", "jpg", "jpeg", "heif", "heic", "pdf", "xlsx", "doc", "docx"];

    /// Classify a path by its extension, case-insensitively.
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "png" => Self::Image(RasterKind::Png),
            "jpg" | "jpeg" => Self::Image(RasterKind::Jpeg),
            "heif" | "heic" => Self::Heif,
            "pdf" => Self::Pdf,
            "xlsx" => Self::Spreadsheet,
            "docx" => Self::WordDocx,
            "doc" => Self::WordLegacy,
            _ => Self::Unsupported(extension),
        }
    }

    /// Whether the converter has a handler for this format.
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image(kind) => write!(f, "image/{:?}", kind),
            Self::Heif => f.write_str("heif"),
            Self::Pdf => f.write_str("pdf"),
            Self::Spreadsheet => f.write_str("spreadsheet"),
            Self::WordDocx => f.write_str("docx"),
            Self::WordLegacy => f.write_str("doc"),
            Self::Unsupported(ext) if ext.is_empty() => f.write_str("unsupported (no extension)"),
            Self::Unsupported(ext) => write!(f, "unsupported (.{})", ext),
        }
    }
}

/// A document on disk awaiting conversion.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Location of the file.
    pub path: PathBuf,
    /// Format derived from the extension.
    pub format: DocumentFormat,
}

impl SourceDocument {
    /// Wrap a path, classifying it by extension.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = DocumentFormat::from_path(&path);
        Self { path, format }
    }

    /// File name used to label report rows.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Content of a normalized payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PayloadContent {
    /// Raster image, Base64 encoded.
    Image { media_type: String, base64: String },
    /// UTF-8 text extracted from a tabular or flow document.
    Text { text: String },
}

/// One unit of content submitted to the extraction service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedPayload {
    /// File name of the originating document.
    pub source: String,
    /// 0-based page index for multi-page sources.
    pub page: Option<u32>,
    /// Encoded content.
    pub content: PayloadContent,
}

impl NormalizedPayload {
    /// Build an image payload, encoding `bytes` as Base64.
    pub fn image(source: impl Into<String>, page: Option<u32>, media_type: &str, bytes: &[u8]) -> Self {
        Self {
            source: source.into(),
            page,
            content: PayloadContent::Image {
                media_type: media_type.to_string(),
                base64: encode(bytes),
            },
        }
    }

    /// Build a text payload.
    pub fn text(source: impl Into<String>, page: Option<u32>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            page,
            content: PayloadContent::Text { text: text.into() },
        }
    }

    /// Whether this payload carries an image.
    pub fn is_image(&self) -> bool {
        matches!(self.content, PayloadContent::Image { .. })
    }

    /// Recover the original bytes: decoded image data, or the UTF-8 text.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        match &self.content {
            PayloadContent::Image { base64, .. } => decode(base64),
            PayloadContent::Text { text } => Ok(text.as_bytes().to_vec()),
        }
    }

    /// `data:` URL for inline image transport.
    pub fn data_url(&self) -> Option<String> {
        match &self.content {
            PayloadContent::Image { media_type, base64 } => {
                Some(format!("data:{};base64,{}", media_type, base64))
            }
            PayloadContent::Text { .. } => None,
        }
    }

    /// Label used in logs and report rows, e.g. `scan.pdf#p2`.
    pub fn label(&self) -> String {
        match self.page {
            Some(page) => format!("{}#p{}", self.source, page + 1),
            None => self.source.clone(),
        }
    }
}

/// Standard padded Base64.
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Inverse of [`encode`].
pub fn decode(text: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_dispatch_is_case_insensitive() {
        assert_eq!(DocumentFormat::from_path(Path::new("a.JPG")), DocumentFormat::Image(RasterKind::Jpeg));
        assert_eq!(DocumentFormat::from_path(Path::new("a.Pdf")), DocumentFormat::Pdf);
        assert_eq!(DocumentFormat::from_path(Path::new("a.HEIC")), DocumentFormat::Heif);
        assert_eq!(DocumentFormat::from_path(Path::new("a.xlsx")), DocumentFormat::Spreadsheet);
        assert_eq!(DocumentFormat::from_path(Path::new("a.doc")), DocumentFormat::WordLegacy);
        assert_eq!(
            DocumentFormat::from_path(Path::new("notes.txt")),
            DocumentFormat::Unsupported("txt".to_string())
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("README")),
            DocumentFormat::Unsupported(String::new())
        );
    }

    #[test]
    fn test_every_listed_extension_is_supported() {
        for ext in DocumentFormat::SUPPORTED_EXTENSIONS {
            let path = PathBuf::from(format!("file.{}", ext));
            assert!(DocumentFormat::from_path(&path).is_supported(), "{}", ext);
        }
    }

    #[test]
    fn test_base64_round_trip() {
        let samples: [&[u8]; 4] = [b"", b"\x00", b"\xff\xfe\x00\x01binary", &[0u8; 1025]];
        for bytes in samples {
            assert_eq!(decode(&encode(bytes)).unwrap(), bytes);
        }
    }

    #[test]
    fn test_payload_decode_and_label() {
        let payload = NormalizedPayload::image("scan.pdf", Some(1), "image/png", b"\x89PNG");
        assert_eq!(payload.decode().unwrap(), b"\x89PNG");
        assert_eq!(payload.label(), "scan.pdf#p2");
        assert!(payload.data_url().unwrap().starts_with("data:image/png;base64,"));

        let text = NormalizedPayload::text("book.xlsx", None, "総額 1,000");
        assert_eq!(text.decode().unwrap(), "総額 1,000".as_bytes());
        assert_eq!(text.data_url(), None);
        assert_eq!(text.label(), "book.xlsx");
    }
}
