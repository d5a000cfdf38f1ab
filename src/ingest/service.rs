use serde::Serialize;
use tracing::info;

use super::csv_table::CsvTable;
use super::error::IngestionError;
use super::normalize::{normalize, NewColumn};
use super::organization::OrganizationResolver;
use crate::database::gateway::PersistenceGateway;
use crate::database::models::{BatchInfo, NewBatch};

/// Result of one upload as reported back to the uploader.
#[derive(Debug, Clone, Serialize)]
pub struct UploadSummary {
    /// `None` when the file had no data rows and nothing was stored.
    pub batch: Option<BatchInfo>,
    pub rows_inserted: u64,
    pub new_columns: Vec<NewColumn>,
}

/// Parses, normalizes and stores uploads.
#[derive(Debug, Clone, Default)]
pub struct Ingestor {
    resolver: OrganizationResolver,
}

impl Ingestor {
    pub fn new(resolver: OrganizationResolver) -> Self {
        Self { resolver }
    }

    /// Ingest one CSV file as a single atomic batch.
    pub async fn ingest(
        &self,
        gateway: &dyn PersistenceGateway,
        bytes: &[u8],
        meta: NewBatch,
    ) -> Result<UploadSummary, IngestionError> {
        let table = CsvTable::parse(bytes)?;
        if table.is_empty() {
            info!("Upload from {} contained no data rows; nothing stored", meta.uploaded_by);
            return Ok(UploadSummary {
                batch: None,
                rows_inserted: 0,
                new_columns: Vec::new(),
            });
        }

        let existing: Vec<String> = gateway
            .known_columns()
            .await?
            .into_iter()
            .map(|c| c.name)
            .collect();

        let batch = normalize(&table, &existing, &self.resolver);
        let stored = gateway.apply_batch(&batch, &meta).await?;

        info!(
            "{} uploaded {} rows ({} new columns) as batch {}",
            meta.uploaded_by,
            stored.row_count,
            batch.new_columns.len(),
            stored.id
        );

        Ok(UploadSummary {
            rows_inserted: stored.row_count as u64,
            new_columns: batch.new_columns,
            batch: Some(stored),
        })
    }
}
