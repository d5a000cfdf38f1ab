use anyhow::Context;
use serde_json::json;
use std::path::Path;

use crate::cli::utils::{output_collection, output_empty_collection, output_success};
use crate::cli::{connect, OutputFormat};
use crate::config::AppConfig;
use crate::database::models::NewBatch;
use crate::database::PersistenceGateway;
use crate::ingest::{Ingestor, OrganizationResolver};

pub async fn ingest(
    config: &AppConfig,
    file: &Path,
    uploaded_by: String,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("could not read {}", file.display()))?;
    let gateway = connect(config).await?;

    let ingestor = Ingestor::new(OrganizationResolver::from_config(&config.organization));
    let file_name = file.file_name().map(|n| n.to_string_lossy().into_owned());
    let summary = ingestor
        .ingest(&gateway, &bytes, NewBatch::new(uploaded_by, file_name))
        .await?;

    let message = match &summary.batch {
        Some(batch) => format!(
            "Stored {} rows as batch {} ({} new columns)",
            summary.rows_inserted,
            batch.id,
            summary.new_columns.len()
        ),
        None => "File has no data rows; nothing stored".to_string(),
    };
    output_success(&output_format, &message, Some(json!({ "upload": summary })))
}

pub async fn organizations(config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let gateway = connect(config).await?;
    let counts = gateway.organizations().await?;
    if counts.is_empty() {
        return output_empty_collection(&output_format, "organizations", "No data uploaded yet");
    }

    match output_format {
        OutputFormat::Json => output_collection("organizations", serde_json::to_value(&counts)?),
        OutputFormat::Text => {
            println!("{:<30} {}", "ORGANIZATION", "ROWS");
            println!("{}", "-".repeat(40));
            for org in &counts {
                println!("{:<30} {}", org.organization, org.count);
            }
            Ok(())
        }
    }
}
