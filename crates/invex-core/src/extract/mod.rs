//! Structured field extraction from normalized payloads.

pub mod client;
pub mod parser;
pub mod prompt;
pub mod rules;

pub use client::ExtractionClient;
pub use parser::{locate_json_object, parse_record, REQUIRED_KEYS};

use std::future::Future;

use crate::error::ExtractionError;
use crate::models::payload::NormalizedPayload;
use crate::models::record::ExtractionRecord;

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// A backend that turns one payload into one structured record.
pub trait Extractor: Send + Sync {
    /// Extract the invoice fields from a payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached or its answer does
    /// not contain a usable JSON object.
    fn extract(&self, payload: &NormalizedPayload) -> impl Future<Output = Result<ExtractionRecord>> + Send;
}
