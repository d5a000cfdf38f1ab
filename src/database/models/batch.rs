use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Ledger entry for one successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct BatchInfo {
    pub id: Uuid,
    pub uploaded_by: String,
    pub file_name: Option<String>,
    pub row_count: i64,
    pub new_columns: i32,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewBatch {
    pub id: Uuid,
    pub uploaded_by: String,
    pub file_name: Option<String>,
}

impl NewBatch {
    pub fn new(uploaded_by: impl Into<String>, file_name: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            uploaded_by: uploaded_by.into(),
            file_name,
        }
    }
}
