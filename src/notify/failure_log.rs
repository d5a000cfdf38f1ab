use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::error;

use super::error::EmailError;

/// One line of the email failure log.
#[derive(Debug, Serialize)]
pub struct FailureRecord<'a> {
    pub timestamp: DateTime<Utc>,
    pub recipients: &'a [String],
    pub subject: &'a str,
    pub kind: &'static str,
    pub detail: String,
}

/// Append-only JSON Lines file of failed sends.
#[derive(Debug, Clone)]
pub struct FailureLog {
    path: PathBuf,
}

impl FailureLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Never fails; a log that cannot be written is reported through tracing.
    pub async fn record(&self, recipients: &[String], subject: &str, err: &EmailError) {
        let record = FailureRecord {
            timestamp: Utc::now(),
            recipients,
            subject,
            kind: err.kind(),
            detail: err.to_string(),
        };

        if let Err(e) = self.append(&record).await {
            error!("Could not write email failure log {}: {}", self.path.display(), e);
        }
    }

    async fn append(&self, record: &FailureRecord<'_>) -> anyhow::Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
