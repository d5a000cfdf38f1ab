use anyhow::Context;
use serde_json::json;
use std::path::Path;

use crate::cli::utils::output_success;
use crate::cli::{connect, OutputFormat};
use crate::config::AppConfig;
use crate::database::PersistenceGateway;
use crate::report::ReportBuilder;
use crate::types::OrgFilter;

pub async fn handle(
    config: &AppConfig,
    output: &Path,
    organization: Option<String>,
    columns: Option<Vec<String>>,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let gateway = connect(config).await?;
    let filter = OrgFilter::parse(organization.as_deref());

    let known = gateway.known_columns().await?;
    let rows = gateway.query_by_organization(&filter).await?;
    let report = ReportBuilder::new(config.report.clone()).pdf(rows, &known, &filter, columns.as_deref())?;

    tokio::fs::write(output, &report.bytes)
        .await
        .with_context(|| format!("could not write {}", output.display()))?;

    output_success(
        &output_format,
        &format!("Wrote '{}' ({} records) to {}", report.title, report.row_count, output.display()),
        Some(json!({ "path": output, "row_count": report.row_count })),
    )
}
