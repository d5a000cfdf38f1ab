use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    Extension,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::auth::Session;
use crate::database::models::{BatchInfo, DataRow, KnownColumn, NewBatch, OrganizationCount};
use crate::error::ApiError;
use crate::ingest::UploadSummary;
use crate::report::ActivationStats;
use crate::middleware::{ApiResponse, ApiResult, Download};
use crate::types::{OrgFilter, ALL_ORGANIZATIONS};

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub file_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OrganizationQuery {
    pub organization: Option<String>,
}

impl OrganizationQuery {
    pub fn filter(&self) -> OrgFilter {
        OrgFilter::parse(self.organization.as_deref())
    }
}

#[derive(Debug, Serialize)]
pub struct DataView {
    pub organization: String,
    pub columns: Vec<KnownColumn>,
    pub count: usize,
    pub rows: Vec<DataRow>,
}

#[derive(Debug, Serialize)]
pub struct OrganizationList {
    /// Selector values: `"All"` followed by every stored organization.
    pub options: Vec<String>,
    pub counts: Vec<OrganizationCount>,
}

#[derive(Debug, Serialize)]
pub struct Stats {
    pub total_rows: i64,
    pub organizations: usize,
    pub columns: usize,
    pub batches: usize,
    pub last_upload_at: Option<DateTime<Utc>>,
    /// `None` until an upload has introduced the configured activation column.
    pub activation: Option<ActivationStats>,
}

/// POST /api/data/upload?file_name=members.csv - Ingest a CSV body as one batch
///
/// The raw request body is the CSV file. The whole upload is stored or none
/// of it is. A file without data rows is accepted and stores nothing.
///
/// Expected Output (Success):
/// ```json
/// {
///   "success": true,
///   "data": {
///     "batch": { "id": "...", "row_count": 120, "new_columns": 2, ... },
///     "rows_inserted": 120,
///     "new_columns": [{ "name": "ward", "label": "Ward" }]
///   }
/// }
/// ```
pub async fn upload(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> ApiResult<UploadSummary> {
    let meta = NewBatch::new(session.username.clone(), query.file_name);
    let summary = state
        .ingestor
        .ingest(state.gateway.as_ref(), &body, meta)
        .await?;

    Ok(if summary.batch.is_some() {
        ApiResponse::created(summary)
    } else {
        ApiResponse {
            data: summary,
            status_code: StatusCode::OK,
        }
    })
}

/// GET /api/data?organization=RS - Stored rows for one organization, or all
pub async fn rows(
    State(state): State<AppState>,
    Query(query): Query<OrganizationQuery>,
) -> ApiResult<DataView> {
    let filter = query.filter();
    let columns = state.gateway.known_columns().await?;
    let rows = state.gateway.query_by_organization(&filter).await?;

    Ok(ApiResponse::success(DataView {
        organization: filter.to_string(),
        columns,
        count: rows.len(),
        rows,
    }))
}

/// GET /api/data/organizations - Values for the organization selector
pub async fn organizations(State(state): State<AppState>) -> ApiResult<OrganizationList> {
    let counts = state.gateway.organizations().await?;
    let options = std::iter::once(ALL_ORGANIZATIONS.to_string())
        .chain(counts.iter().map(|c| c.organization.clone()))
        .collect();
    Ok(ApiResponse::success(OrganizationList { options, counts }))
}

/// GET /api/data/stats - Table summary with the user activation rate
pub async fn stats(State(state): State<AppState>) -> ApiResult<Stats> {
    let counts = state.gateway.organizations().await?;
    let columns = state.gateway.known_columns().await?;
    let batches = state.gateway.list_batches().await?;

    let activation_column = &state.config.report.activation_column;
    let activation = if columns.iter().any(|c| &c.name == activation_column) {
        let rows = state.gateway.query_by_organization(&OrgFilter::All).await?;
        Some(ActivationStats::compute(&rows, activation_column))
    } else {
        None
    };

    Ok(ApiResponse::success(Stats {
        total_rows: counts.iter().map(|c| c.count).sum(),
        organizations: counts.len(),
        columns: columns.len(),
        last_upload_at: batches.iter().map(|b| b.uploaded_at).max(),
        batches: batches.len(),
        activation,
    }))
}

/// GET /api/data/batches - Upload history, newest first
pub async fn batches(State(state): State<AppState>) -> ApiResult<Vec<BatchInfo>> {
    Ok(ApiResponse::success(state.gateway.list_batches().await?))
}

/// GET /api/data/export.csv?organization=RS - Filtered view as CSV
pub async fn export_csv(
    State(state): State<AppState>,
    Query(query): Query<OrganizationQuery>,
) -> Result<Download, ApiError> {
    let filter = query.filter();
    let columns = state.gateway.known_columns().await?;
    let rows = state.gateway.query_by_organization(&filter).await?;
    let report = state.reports.csv(&rows, &columns, &filter)?;
    Ok(Download::csv(report))
}
