use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::error::AuthError;
use crate::database::models::User;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub sid: Uuid,
    pub uid: i32,
    pub adm: bool,
    pub exp: i64,
    pub iat: i64,
}

/// Authenticated user context, inserted into request extensions by the auth middleware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: i32,
    pub username: String,
    pub is_admin: bool,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Signed bearer tokens backed by a server-side registry so logout is immediate.
#[derive(Clone)]
pub struct SessionStore {
    secret: Arc<String>,
    ttl: Duration,
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
}

impl SessionStore {
    pub fn new(secret: impl Into<String>, ttl_hours: u64) -> Self {
        Self {
            secret: Arc::new(secret.into()),
            ttl: Duration::hours(ttl_hours.max(1) as i64),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Open a session for `user` and return it with its bearer token.
    pub async fn issue(&self, user: &User) -> Result<(Session, String), AuthError> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4(),
            user_id: user.id,
            username: user.username.clone(),
            is_admin: user.is_admin,
            issued_at: now,
            expires_at: now + self.ttl,
        };

        let claims = Claims {
            sub: session.username.clone(),
            sid: session.id,
            uid: session.user_id,
            adm: session.is_admin,
            exp: session.expires_at.timestamp(),
            iat: now.timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AuthError::Internal(format!("token generation failed: {}", e)))?;

        let mut sessions = self.sessions.write().await;
        let purged = purge_expired(&mut sessions, now);
        if purged > 0 {
            debug!("Purged {} expired sessions", purged);
        }
        sessions.insert(session.id, session.clone());
        debug!("Opened session {} for {}", session.id, session.username);
        Ok((session, token))
    }

    /// Resolve a bearer token to its live session.
    pub async fn validate(&self, token: &str) -> Result<Session, AuthError> {
        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AuthError::Unauthenticated)?
        .claims;

        let sessions = self.sessions.read().await;
        match sessions.get(&claims.sid) {
            Some(session) if session.expires_at > Utc::now() && session.username == claims.sub => {
                Ok(session.clone())
            }
            _ => Err(AuthError::Unauthenticated),
        }
    }

    pub async fn revoke(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    /// Drop every session belonging to `username`; returns how many were closed.
    pub async fn revoke_user(&self, username: &str) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.username != username);
        before - sessions.len()
    }

    #[cfg(test)]
    pub async fn active(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Expired sessions are dropped whenever a new one is opened.
fn purge_expired(sessions: &mut HashMap<Uuid, Session>, now: DateTime<Utc>) -> usize {
    let before = sessions.len();
    sessions.retain(|_, s| s.expires_at > now);
    before - sessions.len()
}
