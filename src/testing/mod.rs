//! In-memory stand-ins for the database and the mail relay.

use async_trait::async_trait;
use chrono::Utc;
use lettre::Message;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use crate::database::models::{
    BatchInfo, DataRow, KnownColumn, NewBatch, NewUser, OrganizationCount, User,
};
use crate::database::{DatabaseError, PersistenceGateway};
use crate::ingest::{IngestionError, NewColumn, NormalizedBatch};
use crate::notify::{EmailError, MailTransport};
use crate::types::OrgFilter;

pub fn user(username: &str, is_admin: bool) -> User {
    User {
        id: 1,
        username: username.to_string(),
        password_hash: String::new(),
        is_admin,
        email: None,
        created_at: Utc::now(),
    }
}

pub fn known_column(name: &str, label: &str, position: i64) -> KnownColumn {
    KnownColumn {
        name: name.to_string(),
        label: label.to_string(),
        position,
        added_at: Utc::now(),
    }
}

pub fn data_row(id: i64, organization: &str, values: &[(&str, Option<&str>)]) -> DataRow {
    DataRow {
        id,
        batch_id: Uuid::nil(),
        uploaded_at: Utc::now(),
        organization: organization.to_string(),
        values: values
            .iter()
            .map(|(k, v)| (k.to_string(), v.map(str::to_string)))
            .collect(),
    }
}

#[derive(Default)]
struct MemoryState {
    columns: Vec<KnownColumn>,
    rows: Vec<DataRow>,
    batches: Vec<BatchInfo>,
    users: Vec<User>,
}

impl MemoryState {
    fn add_columns(&mut self, columns: &[NewColumn]) {
        for column in columns {
            if !self.columns.iter().any(|c| c.name == column.name) {
                let position = self.columns.len() as i64 + 1;
                self.columns.push(known_column(&column.name, &column.label, position));
            }
        }
    }

    fn insert_rows(&mut self, batch: &NormalizedBatch, batch_id: Uuid) -> u64 {
        let now = Utc::now();
        for row in &batch.rows {
            let id = self.rows.last().map(|r| r.id + 1).unwrap_or(1);
            let values = batch
                .columns
                .iter()
                .cloned()
                .zip(row.values.iter().cloned())
                .collect();
            self.rows.push(DataRow {
                id,
                batch_id,
                uploaded_at: now,
                organization: row.organization.clone(),
                values,
            });
        }
        batch.rows.len() as u64
    }

    /// Rows padded with every known column, as the real table reads back.
    fn read(&self, row: &DataRow) -> DataRow {
        let mut values: BTreeMap<String, Option<String>> =
            self.columns.iter().map(|c| (c.name.clone(), None)).collect();
        for (k, v) in &row.values {
            values.insert(k.clone(), v.clone());
        }
        DataRow {
            values,
            ..row.clone()
        }
    }
}

/// `PersistenceGateway` over a mutex-guarded struct. Batches are atomic: an
/// injected insert failure leaves no columns, rows or ledger entry behind.
#[derive(Default)]
pub struct MemoryGateway {
    state: Mutex<MemoryState>,
    fail_insert: AtomicBool,
}

impl MemoryGateway {
    /// Make the next row insert fail.
    pub fn fail_next_insert(&self) {
        self.fail_insert.store(true, Ordering::SeqCst);
    }

    /// Store a user with a pre-computed hash.
    pub fn insert_user(&self, username: &str, password_hash: &str, is_admin: bool) {
        let mut state = self.state.lock().unwrap();
        let id = state.users.len() as i32 + 1;
        state.users.push(User {
            id,
            password_hash: password_hash.to_string(),
            ..user(username, is_admin)
        });
    }

    fn take_failure(&self) -> Result<(), IngestionError> {
        if self.fail_insert.swap(false, Ordering::SeqCst) {
            Err(IngestionError::Insert("injected insert failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PersistenceGateway for MemoryGateway {
    async fn known_columns(&self) -> Result<Vec<KnownColumn>, DatabaseError> {
        Ok(self.state.lock().unwrap().columns.clone())
    }

    async fn add_columns(&self, columns: &[NewColumn]) -> Result<(), IngestionError> {
        self.state.lock().unwrap().add_columns(columns);
        Ok(())
    }

    async fn insert_rows(&self, batch: &NormalizedBatch, meta: &NewBatch) -> Result<u64, IngestionError> {
        self.take_failure()?;
        Ok(self.state.lock().unwrap().insert_rows(batch, meta.id))
    }

    async fn apply_batch(&self, batch: &NormalizedBatch, meta: &NewBatch) -> Result<BatchInfo, IngestionError> {
        self.take_failure()?;
        let mut state = self.state.lock().unwrap();
        state.add_columns(&batch.new_columns);
        let inserted = state.insert_rows(batch, meta.id);
        let info = BatchInfo {
            id: meta.id,
            uploaded_by: meta.uploaded_by.clone(),
            file_name: meta.file_name.clone(),
            row_count: inserted as i64,
            new_columns: batch.new_columns.len() as i32,
            uploaded_at: Utc::now(),
        };
        state.batches.push(info.clone());
        Ok(info)
    }

    async fn query_by_organization(&self, filter: &OrgFilter) -> Result<Vec<DataRow>, DatabaseError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .rows
            .iter()
            .filter(|r| filter.matches(&r.organization))
            .map(|r| state.read(r))
            .collect())
    }

    async fn organizations(&self) -> Result<Vec<OrganizationCount>, DatabaseError> {
        let state = self.state.lock().unwrap();
        let mut counts: BTreeMap<String, i64> = BTreeMap::new();
        for row in &state.rows {
            *counts.entry(row.organization.clone()).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(organization, count)| OrganizationCount { organization, count })
            .collect())
    }

    async fn list_batches(&self) -> Result<Vec<BatchInfo>, DatabaseError> {
        let mut batches = self.state.lock().unwrap().batches.clone();
        batches.reverse();
        Ok(batches)
    }

    async fn delete_batch(&self, id: Uuid) -> Result<u64, DatabaseError> {
        let mut state = self.state.lock().unwrap();
        let before = state.rows.len();
        state.rows.retain(|r| r.batch_id != id);
        let deleted = (before - state.rows.len()) as u64;
        let ledger_before = state.batches.len();
        state.batches.retain(|b| b.id != id);
        if deleted == 0 && ledger_before == state.batches.len() {
            return Err(DatabaseError::NotFound(format!("batch {}", id)));
        }
        Ok(deleted)
    }

    async fn count_users(&self) -> Result<i64, DatabaseError> {
        Ok(self.state.lock().unwrap().users.len() as i64)
    }

    async fn get_user(&self, username: &str) -> Result<Option<User>, DatabaseError> {
        let state = self.state.lock().unwrap();
        Ok(state.users.iter().find(|u| u.username == username).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, DatabaseError> {
        let mut users = self.state.lock().unwrap().users.clone();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn create_user(&self, new: &NewUser) -> Result<User, DatabaseError> {
        let mut state = self.state.lock().unwrap();
        if state.users.iter().any(|u| u.username == new.username) {
            return Err(DatabaseError::Conflict(format!("user '{}' already exists", new.username)));
        }
        let created = User {
            id: state.users.len() as i32 + 1,
            username: new.username.clone(),
            password_hash: new.password_hash.clone(),
            is_admin: new.is_admin,
            email: new.email.clone(),
            created_at: Utc::now(),
        };
        state.users.push(created.clone());
        Ok(created)
    }

    async fn set_password(&self, username: &str, password_hash: &str) -> Result<bool, DatabaseError> {
        let mut state = self.state.lock().unwrap();
        Ok(match state.users.iter_mut().find(|u| u.username == username) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                true
            }
            None => false,
        })
    }

    async fn set_email(&self, username: &str, email: Option<&str>) -> Result<bool, DatabaseError> {
        let mut state = self.state.lock().unwrap();
        Ok(match state.users.iter_mut().find(|u| u.username == username) {
            Some(user) => {
                user.email = email.map(str::to_string);
                true
            }
            None => false,
        })
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

/// Captures formatted messages instead of sending them.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Vec<u8>>>,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn deliver(&self, message: Message) -> Result<(), EmailError> {
        self.sent.lock().unwrap().push(message.formatted());
        Ok(())
    }
}

/// Fails every delivery with a fixed error.
pub struct FailingTransport {
    permanent: bool,
    reason: String,
}

impl FailingTransport {
    pub fn rejecting(reason: &str) -> Self {
        Self {
            permanent: true,
            reason: reason.to_string(),
        }
    }

    pub fn unreachable(reason: &str) -> Self {
        Self {
            permanent: false,
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl MailTransport for FailingTransport {
    async fn deliver(&self, _message: Message) -> Result<(), EmailError> {
        Err(if self.permanent {
            EmailError::Rejected(self.reason.clone())
        } else {
            EmailError::Transport(self.reason.clone())
        })
    }
}
