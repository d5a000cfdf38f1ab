use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, Transaction};
use std::collections::BTreeMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::database::gateway::PersistenceGateway;
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{
    BatchInfo, DataRow, KnownColumn, NewBatch, NewUser, OrganizationCount, User,
};
use crate::ingest::sanitize::FIXED_COLUMNS;
use crate::ingest::{IngestionError, NewColumn, NormalizedBatch};
use crate::types::OrgFilter;

/// Postgres caps bind parameters per statement at 65535.
const MAX_BIND_PARAMS: usize = 65_535;

const USER_COLUMNS: &str = "id, username, password_hash, is_admin, email, created_at";
const BATCH_COLUMNS: &str = "id, uploaded_by, file_name, row_count, new_columns, uploaded_at";

pub struct PgGateway {
    pool: PgPool,
}

impl PgGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn add_columns_tx(
        tx: &mut Transaction<'_, Postgres>,
        columns: &[NewColumn],
    ) -> Result<(), IngestionError> {
        for column in columns {
            let quoted = DatabaseManager::checked_column(&column.name)
                .map_err(|e| IngestionError::Migration(e.to_string()))?;

            // ALTER TABLE holds an exclusive lock until commit, so a concurrent
            // upload adding the same column waits here and then no-ops.
            let ddl = format!("ALTER TABLE users_data ADD COLUMN IF NOT EXISTS {} TEXT", quoted);
            sqlx::query(&ddl)
                .execute(&mut **tx)
                .await
                .map_err(|e| IngestionError::Migration(format!("adding column {}: {}", column.name, e)))?;

            sqlx::query(
                "INSERT INTO users_data_columns (name, label) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING",
            )
            .bind(&column.name)
            .bind(&column.label)
            .execute(&mut **tx)
            .await
            .map_err(|e| IngestionError::Migration(format!("registering column {}: {}", column.name, e)))?;

            debug!("Added column '{}' to users_data", column.name);
        }
        Ok(())
    }

    async fn insert_rows_tx(
        tx: &mut Transaction<'_, Postgres>,
        batch: &NormalizedBatch,
        batch_id: Uuid,
    ) -> Result<u64, IngestionError> {
        if batch.rows.is_empty() {
            return Ok(0);
        }

        let mut column_list = vec!["batch_id".to_string(), "organization".to_string()];
        for name in &batch.columns {
            column_list.push(
                DatabaseManager::checked_column(name).map_err(|e| IngestionError::Insert(e.to_string()))?,
            );
        }

        let per_row = column_list.len();
        let rows_per_statement = (MAX_BIND_PARAMS / per_row).max(1);
        let prefix = format!("INSERT INTO users_data ({}) ", column_list.join(", "));

        let mut inserted = 0;
        for chunk in batch.rows.chunks(rows_per_statement) {
            let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(prefix.as_str());
            qb.push_values(chunk, |mut b, row| {
                b.push_bind(batch_id).push_bind(row.organization.clone());
                for value in &row.values {
                    b.push_bind(value.clone());
                }
            });

            let result = qb
                .build()
                .execute(&mut **tx)
                .await
                .map_err(|e| IngestionError::Insert(e.to_string()))?;
            inserted += result.rows_affected();
        }
        Ok(inserted)
    }

    fn data_row_from(row: &sqlx::postgres::PgRow) -> Result<DataRow, DatabaseError> {
        let json: Value = row.try_get("row")?;
        let values = match json {
            Value::Object(map) => map
                .into_iter()
                .filter(|(k, _)| !FIXED_COLUMNS.contains(&k.as_str()))
                .map(|(k, v)| (k, json_to_text(v)))
                .collect(),
            _ => BTreeMap::new(),
        };

        Ok(DataRow {
            id: row.try_get("id")?,
            batch_id: row.try_get("batch_id")?,
            uploaded_at: row.try_get("uploaded_at")?,
            organization: row.try_get("organization")?,
            values,
        })
    }
}

fn json_to_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl PersistenceGateway for PgGateway {
    async fn known_columns(&self) -> Result<Vec<KnownColumn>, DatabaseError> {
        let columns = sqlx::query_as::<_, KnownColumn>(
            "SELECT name, label, position, added_at FROM users_data_columns ORDER BY position",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(columns)
    }

    async fn add_columns(&self, columns: &[NewColumn]) -> Result<(), IngestionError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        Self::add_columns_tx(&mut tx, columns).await?;
        tx.commit().await.map_err(|e| IngestionError::Migration(e.to_string()))?;
        Ok(())
    }

    async fn insert_rows(&self, batch: &NormalizedBatch, meta: &NewBatch) -> Result<u64, IngestionError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        let inserted = Self::insert_rows_tx(&mut tx, batch, meta.id).await?;
        tx.commit().await.map_err(|e| IngestionError::Insert(e.to_string()))?;
        Ok(inserted)
    }

    async fn apply_batch(&self, batch: &NormalizedBatch, meta: &NewBatch) -> Result<BatchInfo, IngestionError> {
        // Dropping `tx` on any early return rolls the whole upload back.
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;

        Self::add_columns_tx(&mut tx, &batch.new_columns).await?;
        let inserted = Self::insert_rows_tx(&mut tx, batch, meta.id).await?;

        let info = sqlx::query_as::<_, BatchInfo>(&format!(
            "INSERT INTO upload_batches (id, uploaded_by, file_name, row_count, new_columns) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            BATCH_COLUMNS
        ))
        .bind(meta.id)
        .bind(&meta.uploaded_by)
        .bind(&meta.file_name)
        .bind(inserted as i64)
        .bind(batch.new_columns.len() as i32)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| IngestionError::Insert(e.to_string()))?;

        tx.commit().await.map_err(|e| IngestionError::Insert(e.to_string()))?;

        info!(
            "Stored batch {} ({} rows, {} new columns)",
            info.id,
            info.row_count,
            info.new_columns
        );
        Ok(info)
    }

    async fn query_by_organization(&self, filter: &OrgFilter) -> Result<Vec<DataRow>, DatabaseError> {
        let base = "SELECT t.id, t.batch_id, t.uploaded_at, t.organization, row_to_json(t) AS row \
                    FROM users_data t";

        let rows = match filter {
            OrgFilter::All => {
                sqlx::query(&format!("{} ORDER BY t.id", base))
                    .fetch_all(&self.pool)
                    .await?
            }
            OrgFilter::Exact(org) => {
                sqlx::query(&format!("{} WHERE t.organization = $1 ORDER BY t.id", base))
                    .bind(org)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.iter().map(Self::data_row_from).collect()
    }

    async fn organizations(&self) -> Result<Vec<OrganizationCount>, DatabaseError> {
        let counts = sqlx::query_as::<_, OrganizationCount>(
            "SELECT organization, COUNT(*) AS count FROM users_data GROUP BY organization ORDER BY organization",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(counts)
    }

    async fn list_batches(&self) -> Result<Vec<BatchInfo>, DatabaseError> {
        let batches = sqlx::query_as::<_, BatchInfo>(&format!(
            "SELECT {} FROM upload_batches ORDER BY uploaded_at DESC",
            BATCH_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(batches)
    }

    async fn delete_batch(&self, id: Uuid) -> Result<u64, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM users_data WHERE batch_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let ledger = sqlx::query("DELETE FROM upload_batches WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if ledger == 0 && deleted == 0 {
            return Err(DatabaseError::NotFound(format!("batch {}", id)));
        }

        tx.commit().await?;
        info!("Deleted batch {} ({} rows)", id, deleted);
        Ok(deleted)
    }

    async fn count_users(&self) -> Result<i64, DatabaseError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }

    async fn get_user(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>, DatabaseError> {
        let users = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users ORDER BY username", USER_COLUMNS))
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn create_user(&self, user: &NewUser) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, password_hash, is_admin, email) VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.is_admin)
        .bind(&user.email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_write(e, format!("user '{}' already exists", user.username)))
    }

    async fn set_password(&self, username: &str, password_hash: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE username = $1")
            .bind(username)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_email(&self, username: &str, email: Option<&str>) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE users SET email = $2 WHERE username = $1")
            .bind(username)
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }
}
