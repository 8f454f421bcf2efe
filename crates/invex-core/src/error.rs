//! Error types for the invex-core library.

use thiserror::Error;

/// Main error type for the invex library.
#[derive(Error, Debug)]
pub enum InvexError {
    /// Document conversion error.
    #[error("conversion error: {0}")]
    Convert(#[from] ConvertError),

    /// Remote extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Report generation error.
    #[error("report error: {0}")]
    Report(#[from] ReportError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while normalizing a source document into payloads.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// The file extension is not one of the recognized input formats.
    #[error("unsupported format: {0}")]
    Unsupported(String),

    /// Failed to read the source file.
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to decode or re-encode a raster image.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// The file content is not a PNG or JPEG raster.
    #[error("not a PNG/JPEG image: {0}")]
    NotAnImage(String),

    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Pdf(String),

    /// Failed to render PDF pages.
    #[error("PDF render error: {0}")]
    Render(String),

    /// The PDF is encrypted and cannot be opened with an empty password.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Failed to decode a HEIF/HEIC container.
    #[error("HEIF error: {0}")]
    Heif(String),

    /// Failed to read a spreadsheet.
    #[error("spreadsheet error: {0}")]
    Spreadsheet(String),

    /// Failed to read a word-processing document.
    #[error("document error: {0}")]
    Document(String),

    /// The document was readable but produced nothing to extract from.
    #[error("no extractable content in {0}")]
    Empty(String),
}

/// Errors raised while requesting or parsing a structured extraction.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The HTTP request could not be sent or its body not read.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote service answered with a non-success status.
    #[error("remote service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response envelope did not carry any message content.
    #[error("empty response from remote service")]
    EmptyResponse,

    /// No brace-delimited JSON object was found in the response text.
    #[error("no JSON object found in response")]
    NoJson,

    /// The located JSON object could not be parsed.
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The located JSON value is not an object.
    #[error("response JSON is not an object")]
    NotAnObject,

    /// A required key is missing from the response object.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// No API key is available for the remote service.
    #[error("API key not set (expected in ${0})")]
    MissingApiKey(String),
}

/// Errors raised while writing the completeness report.
#[derive(Error, Debug)]
pub enum ReportError {
    /// Failed to write an XLSX workbook.
    #[error("XLSX write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// Failed to read back an existing XLSX workbook.
    #[error("failed to read existing report: {0}")]
    Existing(String),

    /// Failed to write CSV output.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Failed to serialize a record.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the invex library.
pub type Result<T> = std::result::Result<T, InvexError>;
