// Endpoints that do not require a session.
pub mod auth;
