//! CSV report writer.

use std::fs::OpenOptions;
use std::path::Path;

use tracing::debug;

use super::{Report, Result, HEADERS};

/// Append `report` to the CSV at `path`, writing the header only for a new
/// or empty file.
pub fn write_csv(report: &Report, path: &Path) -> Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let fresh = file.metadata()?.len() == 0;
    debug!("Writing CSV to {} (fresh: {})", path.display(), fresh);

    let mut writer = ::csv::WriterBuilder::new().has_headers(false).from_writer(file);
    if fresh {
        writer.write_record(HEADERS)?;
    }
    for row in report.rows() {
        writer.write_record(row.cells())?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportAggregator;
    use crate::report::tests::sample_record;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");

        let mut aggregator = ReportAggregator::default();
        aggregator.accumulate("a.png", &sample_record(Some(1000)));
        let report = aggregator.finalize();

        write_csv(&report, &path).unwrap();
        write_csv(&report, &path).unwrap();

        let mut reader = ::csv::ReaderBuilder::new().has_headers(false).from_path(&path).unwrap();
        let records: Vec<::csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 3);
        assert_eq!(&records[0][0], "Filename");
        assert_eq!(&records[1][3], "1000");
        assert_eq!(&records[2][6], "True");
    }
}
