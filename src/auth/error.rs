use thiserror::Error;

use crate::database::DatabaseError;

/// Authentication and authorization failures. Display strings are safe to
/// show to clients; internal detail stays in the variant payload for logs.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown username and wrong password are deliberately indistinguishable.
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Administrator privileges required")]
    Forbidden,

    #[error("{0}")]
    InvalidInput(String),

    #[error("User '{0}' already exists")]
    UserExists(String),

    #[error("User '{0}' not found")]
    UserNotFound(String),

    #[error("Authentication service error")]
    Internal(String),
}

impl From<DatabaseError> for AuthError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Conflict(msg) => AuthError::UserExists(msg),
            other => AuthError::Internal(other.to_string()),
        }
    }
}
