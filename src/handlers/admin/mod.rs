// Endpoints behind `require_admin_middleware`.
pub mod batches;
pub mod users;
