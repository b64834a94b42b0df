// Error types for yardbook

use crate::record::RecordKind;
use std::path::PathBuf;
use thiserror::Error;

/// Every failure the library can report
#[derive(Error, Debug)]
pub enum Error {
    /// Referenced record is absent
    #[error("{kind} '{id}' not found")]
    NotFound { kind: RecordKind, id: String },

    /// Imported file lacks required columns
    #[error("{kind} import is missing required column(s): {}", missing.join(", "))]
    SchemaMismatch { kind: RecordKind, missing: Vec<String> },

    /// Persisted store file is unreadable or malformed
    #[error("corrupt store file {}: line {line}: {reason}", path.display())]
    CorruptData { path: PathBuf, line: usize, reason: String },

    /// Creating a record would collide with an existing identifier
    #[error("duplicate {kind} identifier '{id}'")]
    DuplicateIdentifier { kind: RecordKind, id: String },

    /// A cell in an imported file could not be converted
    #[error("row {row}, column '{column}': invalid value '{value}' ({reason})")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
        reason: String,
    },

    /// Identifier or field name rejected on manual entry
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// Configuration file could not be used
    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for yardbook operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_mismatch_lists_columns() {
        let err = Error::SchemaMismatch {
            kind: RecordKind::Quote,
            missing: vec!["id".to_string(), "customer".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("quote"));
        assert!(msg.contains("id, customer"));
    }

    #[test]
    fn test_corrupt_data_names_line() {
        let err = Error::CorruptData {
            path: PathBuf::from("store.jsonl"),
            line: 3,
            reason: "expected value".to_string(),
        };
        assert_eq!(err.to_string(), "corrupt store file store.jsonl: line 3: expected value");
    }

    #[test]
    fn test_not_found_names_identifier() {
        let err = Error::NotFound {
            kind: RecordKind::Job,
            id: "J-9".to_string(),
        };
        assert_eq!(err.to_string(), "job 'J-9' not found");
    }
}
