//! Persistence Gateway: the only writer to `users`, `users_data` and their bookkeeping tables.

use async_trait::async_trait;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    BatchInfo, DataRow, KnownColumn, NewBatch, NewUser, OrganizationCount, User,
};
use crate::ingest::{IngestionError, NewColumn, NormalizedBatch};
use crate::types::OrgFilter;

#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Registered dynamic columns in display order.
    async fn known_columns(&self) -> Result<Vec<KnownColumn>, DatabaseError>;

    /// Add nullable columns. Already-present columns are a no-op.
    async fn add_columns(&self, columns: &[NewColumn]) -> Result<(), IngestionError>;

    /// Insert every row tagged with `meta.id`, or none of them.
    async fn insert_rows(&self, batch: &NormalizedBatch, meta: &NewBatch) -> Result<u64, IngestionError>;

    /// Column additions, row inserts and the ledger entry in one transaction.
    async fn apply_batch(&self, batch: &NormalizedBatch, meta: &NewBatch) -> Result<BatchInfo, IngestionError>;

    /// Rows in insertion order.
    async fn query_by_organization(&self, filter: &OrgFilter) -> Result<Vec<DataRow>, DatabaseError>;

    /// Distinct organizations with row counts, sorted by name.
    async fn organizations(&self) -> Result<Vec<OrganizationCount>, DatabaseError>;

    async fn list_batches(&self) -> Result<Vec<BatchInfo>, DatabaseError>;

    /// Remove a batch and its rows; returns the number of rows removed.
    async fn delete_batch(&self, id: Uuid) -> Result<u64, DatabaseError>;

    async fn count_users(&self) -> Result<i64, DatabaseError>;

    async fn get_user(&self, username: &str) -> Result<Option<User>, DatabaseError>;

    async fn list_users(&self) -> Result<Vec<User>, DatabaseError>;

    /// Fails with `DatabaseError::Conflict` when the username is taken.
    async fn create_user(&self, user: &NewUser) -> Result<User, DatabaseError>;

    /// Returns `false` when no such user exists.
    async fn set_password(&self, username: &str, password_hash: &str) -> Result<bool, DatabaseError>;

    async fn set_email(&self, username: &str, email: Option<&str>) -> Result<bool, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;
}
