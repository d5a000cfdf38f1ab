use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
    Extension,
};

use crate::app::AppState;
use crate::auth::{AuthGate, Session};
use crate::error::ApiError;

/// Resolve the bearer token to a live session and inject it into the request
pub async fn session_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match extract_bearer_token(&headers) {
        Ok(token) => token,
        Err(msg) => return ApiError::unauthorized(msg).into_response(),
    };

    match state.auth.authenticate(&token).await {
        Ok(session) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        Err(err) => ApiError::from(err).into_response(),
    }
}

/// Reject non-admin sessions. Must run inside `session_auth_middleware`.
pub async fn require_admin_middleware(
    Extension(session): Extension<Session>,
    request: Request,
    next: Next,
) -> Response {
    match AuthGate::require_admin(&session) {
        Ok(()) => next.run(request).await,
        Err(err) => {
            tracing::warn!("'{}' denied {}", session.username, request.uri().path());
            ApiError::from(err).into_response()
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header
fn extract_bearer_token(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty bearer token".to_string());
        }
        Ok(token.trim().to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}
