//! Completeness report: one row per extraction record.

pub mod archive;
pub mod csv;
pub mod xlsx;

pub use archive::JsonArchive;

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::ReportError;
use crate::models::config::{ReportConfig, ReportFormat};
use crate::models::record::{CompletenessVerdict, ExtractionRecord};
use crate::validate::CompletenessValidator;

/// Result type for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;

/// Column headers, in output order.
pub const HEADERS: [&str; 7] = [
    "Filename",
    "JSON-All",
    "JSON-Three-Elements",
    "Amount",
    "Date",
    "Trading Partner",
    "Completeness",
];

/// Index of the completeness column.
pub const COMPLETENESS_COLUMN: usize = 6;

/// One report row.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub filename: String,
    pub json_all: String,
    pub json_three: String,
    pub amount: Option<i64>,
    pub date: String,
    pub trading_partner: String,
    pub verdict: CompletenessVerdict,
}

impl ReportRow {
    /// Build a row from a record and its verdict.
    pub fn new(filename: impl Into<String>, record: &ExtractionRecord, verdict: CompletenessVerdict) -> Self {
        Self {
            filename: filename.into(),
            json_all: record.raw.to_string(),
            json_three: record.three_elements().to_string(),
            amount: record.amount.as_option().copied(),
            date: record.date.as_option().map(|d| d.to_string()).unwrap_or_default(),
            trading_partner: record.trading_partner.as_option().cloned().unwrap_or_default(),
            verdict,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.verdict.is_complete()
    }

    /// Cell texts in [`HEADERS`] order.
    pub fn cells(&self) -> [String; 7] {
        [
            self.filename.clone(),
            self.json_all.clone(),
            self.json_three.clone(),
            self.amount.map(|a| a.to_string()).unwrap_or_default(),
            self.date.clone(),
            self.trading_partner.clone(),
            self.verdict.to_string(),
        ]
    }
}

/// Finished report, rows in arrival order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    rows: Vec<ReportRow>,
}

impl Report {
    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows judged complete.
    pub fn complete_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_complete()).count()
    }

    /// Write the report in the configured format, appending to an existing file.
    pub fn write(&self, config: &ReportConfig) -> Result<PathBuf> {
        self.write_to(&config.path, config)
    }

    /// Write the report to `path`, using the other settings from `config`.
    pub fn write_to(&self, path: &Path, config: &ReportConfig) -> Result<PathBuf> {
        match config.format {
            ReportFormat::Xlsx => xlsx::write_xlsx(self, path, &config.sheet_name, config.max_column_width)?,
            ReportFormat::Csv => csv::write_csv(self, path)?,
        }
        info!("Wrote {} row(s) to {}", self.len(), path.display());
        Ok(path.to_path_buf())
    }
}

/// Collects per-payload results into report rows.
#[derive(Debug, Clone, Default)]
pub struct ReportAggregator {
    validator: CompletenessValidator,
    rows: Vec<ReportRow>,
}

impl ReportAggregator {
    pub fn new(validator: CompletenessValidator) -> Self {
        Self {
            validator,
            rows: Vec::new(),
        }
    }

    /// Validate `record` and append its row.
    pub fn accumulate(&mut self, filename: impl Into<String>, record: &ExtractionRecord) -> &ReportRow {
        let verdict = self.validator.validate(record);
        let row = ReportRow::new(filename, record, verdict);
        debug!("Row {}: {} complete={}", self.rows.len() + 1, row.filename, row.is_complete());
        self.rows.push(row);
        &self.rows[self.rows.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn finalize(self) -> Report {
        Report { rows: self.rows }
    }
}

/// Column widths: longest value + 2, capped at `max`.
pub fn column_widths<'a, I, R>(rows: I, max: usize) -> Vec<usize>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = &'a str>,
{
    let mut widths: Vec<usize> = Vec::new();
    for row in rows {
        for (i, cell) in row.into_iter().enumerate() {
            if widths.len() <= i {
                widths.resize(i + 1, 0);
            }
            widths[i] = widths[i].max(cell.chars().count());
        }
    }
    widths.into_iter().map(|w| (w + 2).min(max)).collect()
}
