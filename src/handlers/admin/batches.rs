use axum::{
    extract::{Path, State},
    Extension,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::Session;
use crate::middleware::{ApiResponse, ApiResult};

/// DELETE /api/admin/batches/:id - Remove one upload and its rows
///
/// Columns the batch introduced stay in place.
pub async fn delete(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    let rows_deleted = state.gateway.delete_batch(id).await?;
    tracing::info!("'{}' deleted batch {} ({} rows)", session.username, id, rows_deleted);
    Ok(ApiResponse::success(json!({ "batch_id": id, "rows_deleted": rows_deleted })))
}
