//! Sequential driver: documents to payloads to records to report rows.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::convert::FormatConverter;
use crate::error::{ConvertError, ExtractionError};
use crate::extract::Extractor;
use crate::models::config::InvexConfig;
use crate::models::payload::{DocumentFormat, NormalizedPayload};
use crate::models::record::{CompletenessVerdict, ExtractionRecord};
use crate::report::{JsonArchive, Report, ReportAggregator};
use crate::validate::CompletenessValidator;

/// Counters kept across one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Supported documents that produced at least one payload.
    pub documents_processed: usize,
    /// Documents skipped for an unsupported format.
    pub documents_skipped: usize,
    /// Supported documents whose conversion failed.
    pub conversion_failures: usize,
    /// Payloads submitted for extraction.
    pub payloads: usize,
    /// Payloads whose extraction failed.
    pub extraction_failures: usize,
    /// Rows added to the report.
    pub rows: usize,
}

/// Result of extracting one payload.
#[derive(Debug)]
pub enum PayloadOutcome {
    Extracted {
        payload: NormalizedPayload,
        record: ExtractionRecord,
        verdict: CompletenessVerdict,
    },
    Failed {
        payload: NormalizedPayload,
        error: ExtractionError,
    },
}

impl PayloadOutcome {
    /// Label of the payload this outcome belongs to.
    pub fn label(&self) -> String {
        match self {
            Self::Extracted { payload, .. } | Self::Failed { payload, .. } => payload.label(),
        }
    }
}

/// Result of processing one document.
#[derive(Debug)]
pub enum DocumentOutcome {
    /// The format is not handled; nothing was sent.
    Skipped(String),
    /// The document could not be converted.
    ConversionFailed(ConvertError),
    /// One outcome per payload, in page order.
    Processed(Vec<PayloadOutcome>),
}

/// Runs documents through conversion, extraction and reporting in order.
pub struct Pipeline<E: Extractor> {
    converter: FormatConverter,
    extractor: E,
    validator: CompletenessValidator,
    aggregator: ReportAggregator,
    archive: Option<JsonArchive>,
    stats: RunStats,
}

impl<E: Extractor> Pipeline<E> {
    /// Build a pipeline from configuration and an extraction backend.
    pub fn new(config: &InvexConfig, extractor: E) -> Self {
        let validator = CompletenessValidator::from_config(&config.validation);
        Self {
            converter: FormatConverter::new(config.converter.clone()),
            extractor,
            aggregator: ReportAggregator::new(validator.clone()),
            validator,
            archive: config.report.archive_dir.clone().map(JsonArchive::new),
            stats: RunStats::default(),
        }
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Process one document. Failures are recorded, never propagated.
    pub async fn process_document(&mut self, path: &Path) -> DocumentOutcome {
        let format = DocumentFormat::from_path(path);
        if !format.is_supported() {
            warn!("Skipping {}: {}", path.display(), format);
            self.stats.documents_skipped += 1;
            return DocumentOutcome::Skipped(format.to_string());
        }

        let payloads = match self.converter.try_convert(path) {
            Ok(payloads) => payloads,
            Err(e) => {
                warn!("Conversion failed for {}: {}", path.display(), e);
                self.stats.conversion_failures += 1;
                return DocumentOutcome::ConversionFailed(e);
            }
        };
        self.stats.documents_processed += 1;

        let mut outcomes = Vec::with_capacity(payloads.len());
        for payload in payloads {
            outcomes.push(self.process_payload(payload).await);
        }
        DocumentOutcome::Processed(outcomes)
    }

    async fn process_payload(&mut self, payload: NormalizedPayload) -> PayloadOutcome {
        self.stats.payloads += 1;
        debug!("Extracting {}", payload.label());

        let record = match self.extractor.extract(&payload).await {
            Ok(record) => record,
            Err(error) => {
                warn!("Extraction failed for {}: {}", payload.label(), error);
                self.stats.extraction_failures += 1;
                return PayloadOutcome::Failed { payload, error };
            }
        };

        if let Some(archive) = &self.archive {
            if let Err(e) = archive.save(&payload, &record) {
                warn!("Could not archive {}: {}", payload.label(), e);
            }
        }

        let row = self.aggregator.accumulate(payload.source.clone(), &record);
        let verdict = row.verdict.clone();
        self.stats.rows += 1;
        info!("{}: complete={}", payload.label(), verdict);

        PayloadOutcome::Extracted {
            payload,
            record,
            verdict,
        }
    }

    /// Process every path in order.
    pub async fn run<I, P>(&mut self, paths: I) -> &RunStats
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        for path in paths {
            self.process_document(path.as_ref()).await;
        }
        &self.stats
    }

    /// Validator in use, for re-checking records outside the run.
    pub fn validator(&self) -> &CompletenessValidator {
        &self.validator
    }

    /// End the run, returning the finished report and statistics.
    pub fn finish(self) -> (Report, RunStats) {
        info!(
            "Run finished: {} processed, {} skipped, {} rows",
            self.stats.documents_processed, self.stats.documents_skipped, self.stats.rows
        );
        (self.aggregator.finalize(), self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::Field;
    use pretty_assertions::assert_eq;
    use std::fs;

    /// Answers every payload with the same amount, failing on text payloads.
    struct FixedExtractor;

    impl Extractor for FixedExtractor {
        async fn extract(&self, payload: &NormalizedPayload) -> Result<ExtractionRecord, ExtractionError> {
            if !payload.is_image() {
                return Err(ExtractionError::NoJson);
            }
            Ok(ExtractionRecord {
                amount: Field::Present(100),
                date: Field::Absent,
                trading_partner: Field::Present("ABC".to_string()),
                registration_number: Field::Absent,
                raw: serde_json::json!({"amount": 100}),
            })
        }
    }

    fn write_png(path: &Path) {
        let img = image::DynamicImage::ImageRgb8(image::ImageBuffer::from_pixel(2, 2, image::Rgb([1, 2, 3])));
        fs::write(path, crate::convert::encode_png(&img).unwrap()).unwrap();
    }

    #[tokio::test]
    async fn test_unsupported_and_failures_are_counted() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("a.png");
        let notes = dir.path().join("notes.txt");
        let broken = dir.path().join("broken.jpg");
        let docx = dir.path().join("c.docx");
        write_png(&png);
        fs::write(&notes, "hello").unwrap();
        fs::write(&broken, "not an image").unwrap();
        docx_rs::Docx::new()
            .add_paragraph(docx_rs::Paragraph::new().add_run(docx_rs::Run::new().add_text("Total 100")))
            .build()
            .pack(fs::File::create(&docx).unwrap())
            .unwrap();

        let mut pipeline = Pipeline::new(&InvexConfig::default(), FixedExtractor);
        pipeline.run([&notes, &png, &broken, &docx]).await;
        let (report, stats) = pipeline.finish();

        assert_eq!(
            stats,
            RunStats {
                documents_processed: 2,
                documents_skipped: 1,
                conversion_failures: 1,
                payloads: 2,
                extraction_failures: 1,
                rows: 1,
            }
        );
        assert_eq!(report.len(), 1);
        assert_eq!(report.rows()[0].filename, "a.png");
        assert!(!report.rows()[0].is_complete());
    }

    #[tokio::test]
    async fn test_archive_written_for_successes() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("receipt.png");
        write_png(&png);

        let mut config = InvexConfig::default();
        config.report.archive_dir = Some(dir.path().join("jsons"));
        let mut pipeline = Pipeline::new(&config, FixedExtractor);

        match pipeline.process_document(&png).await {
            DocumentOutcome::Processed(outcomes) => {
                assert_eq!(outcomes.len(), 1);
                assert_eq!(outcomes[0].label(), "receipt.png");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(fs::read_dir(dir.path().join("jsons")).unwrap().count(), 1);
    }
}
