//! Raw JSON archive: one file per successful extraction.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::debug;

use super::Result;
use crate::models::payload::NormalizedPayload;
use crate::models::record::ExtractionRecord;

/// Writes each record's raw response object to its own file.
#[derive(Debug, Clone)]
pub struct JsonArchive {
    dir: PathBuf,
}

impl JsonArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save `record.raw` as `<stem>[_p<page>]_<timestamp>.json`.
    pub fn save(&self, payload: &NormalizedPayload, record: &ExtractionRecord) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let stem = Path::new(&payload.source)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "response".to_string());
        let page = payload.page.map(|p| format!("_p{}", p + 1)).unwrap_or_default();
        let timestamp = Local::now().format("%Y%m%d_%H%M%S_%3f");

        let path = self.dir.join(format!("{}{}_{}.json", stem, page, timestamp));
        fs::write(&path, serde_json::to_string_pretty(&record.raw)?)?;
        debug!("Archived {} to {}", payload.label(), path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::Field;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_archive_file_name_and_content() {
        let dir = tempfile::tempdir().unwrap();
        let archive = JsonArchive::new(dir.path().join("jsons"));

        let payload = NormalizedPayload::image("scan.pdf", Some(1), "image/png", b"x");
        let record = ExtractionRecord {
            amount: Field::Present(500),
            date: Field::Absent,
            trading_partner: Field::Absent,
            registration_number: Field::Absent,
            raw: json!({"amount": 500, "date": null, "trading_partner": null}),
        };

        let path = archive.save(&payload, &record).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("scan_p2_"), "{}", name);
        assert!(name.ends_with(".json"));

        let saved: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved, record.raw);
    }
}
