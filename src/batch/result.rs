//! Conversion result types.

use serde::{Deserialize, Serialize};

/// Message recorded for a converted primary document
pub const DOCUMENT_SUCCESS: &str = "Conversion completed successfully.";

/// Message recorded for a converted sub-form
pub const FORM_SUCCESS: &str = "FRM conversion completed successfully.";

/// Outcome of one conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConversionStatus {
    Success,
    Error,
}

/// One entry of the conversion report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRecord {
    pub source_file: String,
    /// Empty when the conversion failed
    pub output_file: String,
    pub status: ConversionStatus,
    pub message: String,
}

impl ConversionRecord {
    pub fn success(source_file: impl Into<String>, output_file: impl Into<String>, message: &str) -> Self {
        Self {
            source_file: source_file.into(),
            output_file: output_file.into(),
            status: ConversionStatus::Success,
            message: message.to_string(),
        }
    }

    pub fn error(source_file: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            output_file: String::new(),
            status: ConversionStatus::Error,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ConversionStatus::Success
    }
}

/// Number of failed records.
pub fn failure_count(records: &[ConversionRecord]) -> usize {
    records.iter().filter(|r| !r.is_success()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_uppercase() {
        let record = ConversionRecord::success("a.dbm", "a.dfa", DOCUMENT_SUCCESS);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "SUCCESS");
        assert_eq!(json["message"], "Conversion completed successfully.");

        let failed = ConversionRecord::error("b.dbm", "boom");
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["status"], "ERROR");
        assert_eq!(json["output_file"], "");
    }

    #[test]
    fn test_failure_count() {
        let records = vec![
            ConversionRecord::success("a.frm", "a.dfa", FORM_SUCCESS),
            ConversionRecord::error("b.dbm", "boom"),
        ];
        assert_eq!(failure_count(&records), 1);
    }
}
