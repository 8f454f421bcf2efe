//! Completeness checks over extraction records.

use tracing::debug;

use crate::models::config::ValidationConfig;
use crate::models::record::{CompletenessVerdict, ExtractionRecord, FieldName};

/// Decides whether a record carries every required field.
#[derive(Debug, Clone)]
pub struct CompletenessValidator {
    required: Vec<FieldName>,
}

impl CompletenessValidator {
    pub fn new(required: Vec<FieldName>) -> Self {
        Self { required }
    }

    pub fn from_config(config: &ValidationConfig) -> Self {
        Self::new(config.required_fields.clone())
    }

    /// Fields this validator insists on.
    pub fn required(&self) -> &[FieldName] {
        &self.required
    }

    /// Complete iff every required field is present.
    pub fn validate(&self, record: &ExtractionRecord) -> CompletenessVerdict {
        let missing: Vec<FieldName> = self
            .required
            .iter()
            .copied()
            .filter(|field| !record.has(*field))
            .collect();

        if !missing.is_empty() {
            debug!("Incomplete record, missing {:?}", missing);
        }
        CompletenessVerdict { missing }
    }
}

impl Default for CompletenessValidator {
    fn default() -> Self {
        Self::from_config(&ValidationConfig::default())
    }
}
