//! `conversion_report.json` writer.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use super::{BatchError, ConversionRecord};

pub const REPORT_FILE: &str = "conversion_report.json";

/// Write `records` as a pretty-printed JSON array into `output_dir`.
pub fn write_report(output_dir: &Path, records: &[ConversionRecord]) -> Result<PathBuf, BatchError> {
    let path = output_dir.join(REPORT_FILE);
    let json = serde_json::to_string_pretty(records)?;
    fs::write(&path, json)?;
    info!("Conversion report saved to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{ConversionStatus, DOCUMENT_SUCCESS};
    use tempfile::TempDir;

    #[test]
    fn test_report_round_trip() {
        let temp = TempDir::new().unwrap();
        let records = vec![
            ConversionRecord::success("a.dbm", "a.dfa", DOCUMENT_SUCCESS),
            ConversionRecord::error("b.dbm", "Failed to read b.dbm"),
        ];
        let path = write_report(temp.path(), &records).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("[\n  {"));

        let parsed: Vec<ConversionRecord> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, records);
        assert_eq!(parsed[1].status, ConversionStatus::Error);
    }
}
