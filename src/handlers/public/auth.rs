use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: SessionUser,
}

#[derive(Debug, Serialize)]
pub struct SessionUser {
    pub username: String,
    pub is_admin: bool,
}

/// POST /auth/login - Authenticate and receive a bearer token
///
/// Expected Input:
/// ```json
/// { "username": "admin", "password": "..." }
/// ```
///
/// Expected Output (Success):
/// ```json
/// {
///   "success": true,
///   "data": {
///     "token": "eyJhbGciOiJIUzI1NiI...",
///     "expires_at": "2025-01-01T12:00:00Z",
///     "user": { "username": "admin", "is_admin": true }
///   }
/// }
/// ```
///
/// Wrong password and unknown user produce the same 401.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let (session, token) = state
        .auth
        .login(state.gateway.as_ref(), &payload.username, &payload.password)
        .await?;

    Ok(ApiResponse::success(LoginResponse {
        token,
        expires_at: session.expires_at,
        user: SessionUser {
            username: session.username,
            is_admin: session.is_admin,
        },
    }))
}
