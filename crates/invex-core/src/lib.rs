//! Core library for invoice document extraction.
//!
//! This crate provides:
//! - Document normalization (images, HEIF, scanned PDFs, spreadsheets, Word files)
//! - Structured field extraction through an OpenAI-compatible chat API
//! - Field normalization rules (amounts, dates, partner names, registration numbers)
//! - Completeness validation and XLSX/CSV reporting

pub mod convert;
pub mod error;
pub mod extract;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod validate;

pub use convert::FormatConverter;
pub use error::{ConvertError, ExtractionError, InvexError, ReportError, Result};
pub use extract::{ExtractionClient, Extractor};
pub use models::config::{InvexConfig, ReportFormat};
pub use models::payload::{DocumentFormat, NormalizedPayload, PayloadContent, RasterKind, SourceDocument};
pub use models::record::{CompletenessVerdict, ExtractionRecord, Field, FieldName, InvoiceDate};
pub use pipeline::{DocumentOutcome, PayloadOutcome, Pipeline, RunStats};
pub use report::{JsonArchive, Report, ReportAggregator, ReportRow};
pub use validate::CompletenessValidator;
