// Endpoints behind `session_auth_middleware`.
pub mod auth;
pub mod data;
pub mod report;
