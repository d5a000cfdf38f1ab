use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::auth::Session;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Serialize)]
pub struct WhoAmI {
    #[serde(flatten)]
    pub session: Session,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct SetEmailRequest {
    /// `null` or blank clears the address.
    pub email: Option<String>,
}

/// GET /api/auth/whoami - Current session and profile
pub async fn whoami(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<WhoAmI> {
    let email = state
        .gateway
        .get_user(&session.username)
        .await?
        .and_then(|u| u.email);
    Ok(ApiResponse::success(WhoAmI { session, email }))
}

/// DELETE /api/auth/session - Log out; the token stops working immediately
pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Value> {
    state.auth.logout(&session).await;
    Ok(ApiResponse::success(json!({ "logged_out": true })))
}

/// PUT /api/auth/password - Change own password
///
/// ```json
/// { "current_password": "...", "new_password": "at least 8 chars" }
/// ```
pub async fn change_password(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(payload): Json<ChangePasswordRequest>,
) -> ApiResult<Value> {
    state
        .auth
        .change_password(
            state.gateway.as_ref(),
            &session,
            &payload.current_password,
            &payload.new_password,
        )
        .await?;
    Ok(ApiResponse::success(json!({ "password_changed": true })))
}

/// PUT /api/auth/email - Set or clear own notification address
pub async fn set_email(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(payload): Json<SetEmailRequest>,
) -> ApiResult<Value> {
    let email = state
        .auth
        .set_email(state.gateway.as_ref(), &session, payload.email.as_deref())
        .await?;
    Ok(ApiResponse::success(json!({ "email": email })))
}
