use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::auth::{NewAccount, Session};
use crate::database::models::User;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

/// GET /api/admin/users - Every account, without password hashes
pub async fn list(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Vec<User>> {
    let users = state.auth.list_users(state.gateway.as_ref(), &session).await?;
    Ok(ApiResponse::success(users))
}

/// POST /api/admin/users - Create an account
///
/// ```json
/// { "username": "clerk", "password": "at least 8 chars", "is_admin": false, "email": null }
/// ```
pub async fn create(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(account): Json<NewAccount>,
) -> ApiResult<User> {
    let user = state
        .auth
        .create_user(state.gateway.as_ref(), &session, account)
        .await?;
    Ok(ApiResponse::created(user))
}

/// PUT /api/admin/users/:username/password - Reset another user's password
pub async fn reset_password(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(username): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> ApiResult<Value> {
    state
        .auth
        .reset_password(state.gateway.as_ref(), &session, &username, &payload.new_password)
        .await?;
    Ok(ApiResponse::success(json!({ "username": username, "password_reset": true })))
}
