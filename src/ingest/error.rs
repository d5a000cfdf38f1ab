use thiserror::Error;

use crate::database::DatabaseError;

/// Failures while turning an uploaded CSV into stored rows. Every variant
/// means the whole batch was rejected; nothing from it was persisted.
#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("Malformed CSV at line {line}: {reason}")]
    MalformedCsv { line: u64, reason: String },

    #[error("Schema migration failed: {0}")]
    Migration(String),

    #[error("Row insert failed: {0}")]
    Insert(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<csv::Error> for IngestionError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        let reason = match err.kind() {
            csv::ErrorKind::UnequalLengths { expected_len, len, .. } => {
                format!("expected {} fields, found {}", expected_len, len)
            }
            csv::ErrorKind::Utf8 { .. } => "content is not valid UTF-8".to_string(),
            _ => err.to_string(),
        };
        IngestionError::MalformedCsv { line, reason }
    }
}
