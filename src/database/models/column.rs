use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Entry in the `users_data_columns` registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct KnownColumn {
    pub name: String,
    pub label: String,
    pub position: i64,
    pub added_at: DateTime<Utc>,
}
