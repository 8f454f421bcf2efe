//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::record::FieldName;

/// Main configuration for the invex pipeline.
///
/// One value is built per run and handed to each component at construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InvexConfig {
    /// Document conversion configuration.
    pub converter: ConverterConfig,

    /// Remote extraction service configuration.
    pub service: ServiceConfig,

    /// Response interpretation configuration.
    pub extraction: ExtractionConfig,

    /// Completeness policy.
    pub validation: ValidationConfig,

    /// Report output configuration.
    pub report: ReportConfig,
}

/// Document conversion configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Maximum PDF pages to convert (0 = unlimited).
    pub pdf_max_pages: usize,

    /// Emit a page's embedded text when the page is not a full-page scan.
    pub pdf_text_fallback: bool,

    /// Render resolution for PDF pages when built with `pdf-render`.
    pub pdf_render_dpi: u32,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            pdf_max_pages: 0,
            pdf_text_fallback: true,
            pdf_render_dpi: 200,
        }
    }
}

/// Remote extraction service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL of an OpenAI-compatible API.
    pub base_url: String,

    /// Model identifier.
    pub model: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// Completion token limit.
    pub max_tokens: u32,

    /// Request deadline in seconds.
    pub timeout_secs: u64,

    /// Image detail hint (`low`, `high`, `auto`).
    pub image_detail: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-2024-08-06".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            max_tokens: 2000,
            timeout_secs: 60,
            image_detail: "high".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

/// Response interpretation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Request a strict JSON schema response.
    pub structured_output: bool,

    /// Ask the model for the invoice registration number.
    pub request_registration_number: bool,

    /// Drop registration numbers that do not match the `T` + 8 pattern.
    pub validate_registration_number: bool,

    /// Treat an amount of zero as unreadable.
    pub zero_amount_is_absent: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            structured_output: true,
            request_registration_number: true,
            validate_registration_number: true,
            zero_amount_is_absent: true,
        }
    }
}

/// Completeness policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Fields that must be present for a record to be complete.
    pub required_fields: Vec<FieldName>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            required_fields: vec![FieldName::Amount, FieldName::Date, FieldName::TradingPartner],
        }
    }
}

/// Report file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Excel workbook with colour markers.
    #[default]
    Xlsx,
    /// Plain CSV.
    Csv,
}

/// Report output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Output format.
    pub format: ReportFormat,

    /// Report file location.
    pub path: PathBuf,

    /// Worksheet name for fresh XLSX reports.
    pub sheet_name: String,

    /// Upper bound for auto-sized column widths.
    pub max_column_width: usize,

    /// Directory for per-record raw JSON files (disabled when unset).
    pub archive_dir: Option<PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: ReportFormat::Xlsx,
            path: PathBuf::from("json_check.xlsx"),
            sheet_name: "json_check".to_string(),
            max_column_width: 60,
            archive_dir: None,
        }
    }
}

impl InvexConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: InvexConfig =
            serde_json::from_str(r#"{"report": {"format": "csv", "path": "out.csv"}}"#).unwrap();

        assert_eq!(config.report.format, ReportFormat::Csv);
        assert_eq!(config.report.path, PathBuf::from("out.csv"));
        assert_eq!(config.report.max_column_width, 60);
        assert_eq!(config.service.model, "gpt-4o-2024-08-06");
        assert_eq!(config.validation.required_fields.len(), 3);
    }

    #[test]
    fn save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = InvexConfig::default();
        config.extraction.zero_amount_is_absent = false;
        config.save(&path).unwrap();

        let loaded = InvexConfig::from_file(&path).unwrap();
        assert!(!loaded.extraction.zero_amount_is_absent);
        assert_eq!(loaded.report.sheet_name, "json_check");
    }
}
