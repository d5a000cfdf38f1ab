use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;
use uuid::Uuid;

/// One stored CSV row. Dynamic columns the row predates read as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRow {
    pub id: i64,
    pub batch_id: Uuid,
    pub uploaded_at: DateTime<Utc>,
    pub organization: String,
    pub values: BTreeMap<String, Option<String>>,
}

impl DataRow {
    /// Value of a dynamic column, or the organization for `"organization"`.
    pub fn get(&self, column: &str) -> Option<&str> {
        if column == "organization" {
            return Some(self.organization.as_str());
        }
        self.values.get(column).and_then(|v| v.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct OrganizationCount {
    pub organization: String,
    pub count: i64,
}
