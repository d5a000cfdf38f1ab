use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::auth::Session;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, Download};
use crate::notify::{EmailAttachment, OutgoingEmail};
use crate::report::RenderedReport;
use crate::types::OrgFilter;

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub organization: Option<String>,
    /// Comma-separated column names.
    pub columns: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmailReportRequest {
    pub organization: Option<String>,
    pub columns: Option<Vec<String>>,
    /// Defaults to the caller's stored address.
    pub to: Option<Vec<String>>,
    pub subject: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EmailReportResponse {
    pub sent_to: Vec<String>,
    pub file_name: String,
    pub row_count: usize,
}

async fn render_pdf(
    state: &AppState,
    filter: &OrgFilter,
    columns: Option<&[String]>,
) -> Result<RenderedReport, ApiError> {
    let known = state.gateway.known_columns().await?;
    let rows = state.gateway.query_by_organization(filter).await?;
    Ok(state.reports.pdf(rows, &known, filter, columns)?)
}

fn split_columns(raw: Option<&str>) -> Option<Vec<String>> {
    raw.map(|list| {
        list.split(',')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect()
    })
}

/// GET /api/report/pdf?organization=RS&columns=first_name,email - Download the PDF report
pub async fn pdf(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Download, ApiError> {
    let filter = OrgFilter::parse(query.organization.as_deref());
    let columns = split_columns(query.columns.as_deref());
    let report = render_pdf(&state, &filter, columns.as_deref()).await?;
    Ok(Download::pdf(report))
}

/// POST /api/report/email - Render the PDF report and email it
///
/// Expected Input:
/// ```json
/// { "organization": "RS", "to": ["clerk@example.org"] }
/// ```
///
/// Without `to` the report goes to the caller's own address. Delivery
/// failures return 502 and are recorded in the email failure log.
pub async fn email(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(payload): Json<EmailReportRequest>,
) -> ApiResult<EmailReportResponse> {
    let recipients = match payload.to.filter(|to| !to.is_empty()) {
        Some(to) => to,
        None => state
            .gateway
            .get_user(&session.username)
            .await?
            .and_then(|u| u.email)
            .map(|email| vec![email])
            .ok_or_else(|| {
                ApiError::validation_error("No recipients given and no email address on file")
            })?,
    };

    let filter = OrgFilter::parse(payload.organization.as_deref());
    let report = render_pdf(&state, &filter, payload.columns.as_deref()).await?;

    let email = OutgoingEmail {
        to: recipients,
        subject: payload.subject.unwrap_or_else(|| report.title.clone()),
        body: payload.body.unwrap_or_else(|| {
            format!(
                "{} ({} records) is attached.\n\nSent by {}.",
                report.title, report.row_count, session.username
            )
        }),
        attachment: Some(EmailAttachment::pdf(report.file_name.clone(), report.bytes)),
    };
    state.notifier.send(&email).await?;

    Ok(ApiResponse::success(EmailReportResponse {
        sent_to: email.to,
        file_name: report.file_name,
        row_count: report.row_count,
    }))
}
