use serde::Deserialize;
use tracing::{info, warn};

use super::error::AuthError;
use super::passwords::{self, PasswordCheck};
use super::session::{Session, SessionStore};
use super::validation::{validate_email, validate_password, validate_username};
use crate::database::models::{NewUser, User};
use crate::database::{DatabaseError, PersistenceGateway};

pub const BOOTSTRAP_ADMIN: &str = "admin";

/// Account creation request, from the admin API or the CLI.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub email: Option<String>,
}

/// Login, session lifecycle and account management.
#[derive(Clone)]
pub struct AuthGate {
    sessions: SessionStore,
}

impl AuthGate {
    pub fn new(sessions: SessionStore) -> Self {
        Self { sessions }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub async fn login(
        &self,
        gateway: &dyn PersistenceGateway,
        username: &str,
        password: &str,
    ) -> Result<(Session, String), AuthError> {
        let username = username.trim();
        let Some(user) = gateway.get_user(username).await? else {
            let password = password.to_string();
            let _ = tokio::task::spawn_blocking(move || passwords::verify_dummy(&password)).await;
            warn!("Login failed for unknown user '{}'", username);
            return Err(AuthError::InvalidCredentials);
        };

        match verify_blocking(&user.password_hash, password).await? {
            PasswordCheck::Invalid => {
                warn!("Login failed for '{}'", username);
                return Err(AuthError::InvalidCredentials);
            }
            PasswordCheck::ValidLegacy => {
                let upgraded = hash_blocking(password).await?;
                gateway.set_password(&user.username, &upgraded).await?;
                info!("Upgraded legacy password hash for '{}'", user.username);
            }
            PasswordCheck::Valid => {}
        }

        let (session, token) = self.sessions.issue(&user).await?;
        info!("'{}' logged in (admin: {})", user.username, user.is_admin);
        Ok((session, token))
    }

    pub async fn authenticate(&self, token: &str) -> Result<Session, AuthError> {
        self.sessions.validate(token).await
    }

    pub async fn logout(&self, session: &Session) {
        if self.sessions.revoke(session.id).await {
            info!("'{}' logged out", session.username);
        }
    }

    pub fn require_admin(session: &Session) -> Result<(), AuthError> {
        if session.is_admin {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }

    /// Change the caller's own password after re-checking the current one.
    pub async fn change_password(
        &self,
        gateway: &dyn PersistenceGateway,
        session: &Session,
        current: &str,
        new: &str,
    ) -> Result<(), AuthError> {
        let user = gateway
            .get_user(&session.username)
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        if !verify_blocking(&user.password_hash, current).await?.is_valid() {
            return Err(AuthError::InvalidCredentials);
        }
        validate_password(new)?;

        let hash = hash_blocking(new).await?;
        gateway.set_password(&user.username, &hash).await?;
        info!("'{}' changed their password", user.username);
        Ok(())
    }

    /// Set or clear the caller's notification address.
    pub async fn set_email(
        &self,
        gateway: &dyn PersistenceGateway,
        session: &Session,
        email: Option<&str>,
    ) -> Result<Option<String>, AuthError> {
        let email = email.map(str::trim).filter(|e| !e.is_empty());
        if let Some(address) = email {
            validate_email(address)?;
        }

        if !gateway.set_email(&session.username, email).await? {
            return Err(AuthError::Unauthenticated);
        }
        Ok(email.map(str::to_string))
    }

    pub async fn create_user(
        &self,
        gateway: &dyn PersistenceGateway,
        session: &Session,
        account: NewAccount,
    ) -> Result<User, AuthError> {
        Self::require_admin(session)?;
        let user = provision_user(gateway, account).await?;
        info!("'{}' created user '{}'", session.username, user.username);
        Ok(user)
    }

    /// Admin reset of another user's password. Their open sessions are closed.
    pub async fn reset_password(
        &self,
        gateway: &dyn PersistenceGateway,
        session: &Session,
        username: &str,
        new: &str,
    ) -> Result<(), AuthError> {
        Self::require_admin(session)?;
        set_user_password(gateway, username, new).await?;
        if username != session.username {
            self.sessions.revoke_user(username).await;
        }
        info!("'{}' reset the password of '{}'", session.username, username);
        Ok(())
    }

    pub async fn list_users(
        &self,
        gateway: &dyn PersistenceGateway,
        session: &Session,
    ) -> Result<Vec<User>, AuthError> {
        Self::require_admin(session)?;
        Ok(gateway.list_users().await?)
    }
}

/// Create an account without a session check. Used by admin handlers and the CLI.
pub async fn provision_user(
    gateway: &dyn PersistenceGateway,
    account: NewAccount,
) -> Result<User, AuthError> {
    let username = account.username.trim().to_string();
    validate_username(&username)?;
    validate_password(&account.password)?;
    let email = account.email.as_deref().map(str::trim).filter(|e| !e.is_empty());
    if let Some(address) = email {
        validate_email(address)?;
    }

    let new_user = NewUser {
        password_hash: hash_blocking(&account.password).await?,
        username: username.clone(),
        is_admin: account.is_admin,
        email: email.map(str::to_string),
    };

    gateway.create_user(&new_user).await.map_err(|e| match e {
        DatabaseError::Conflict(_) => AuthError::UserExists(username),
        other => other.into(),
    })
}

pub async fn set_user_password(
    gateway: &dyn PersistenceGateway,
    username: &str,
    new: &str,
) -> Result<(), AuthError> {
    validate_password(new)?;
    let hash = hash_blocking(new).await?;
    if !gateway.set_password(username, &hash).await? {
        return Err(AuthError::UserNotFound(username.to_string()));
    }
    Ok(())
}

/// Create the default administrator when no users exist. Returns `true` when one was created.
///
/// Safe to run on every startup and from several processes at once: a
/// concurrent creation shows up as a conflict and is treated as success.
pub async fn bootstrap_admin(
    gateway: &dyn PersistenceGateway,
    password: &str,
) -> Result<bool, AuthError> {
    if gateway.count_users().await? > 0 {
        return Ok(false);
    }

    let account = NewAccount {
        username: BOOTSTRAP_ADMIN.to_string(),
        password: password.to_string(),
        is_admin: true,
        email: None,
    };

    // The bootstrap password may be shorter than the policy allows, so skip validation.
    let new_user = NewUser {
        password_hash: hash_blocking(&account.password).await?,
        username: account.username,
        is_admin: true,
        email: None,
    };

    match gateway.create_user(&new_user).await {
        Ok(_) => {
            warn!("Created bootstrap administrator '{}'; change its password", BOOTSTRAP_ADMIN);
            Ok(true)
        }
        Err(DatabaseError::Conflict(_)) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

async fn hash_blocking(password: &str) -> Result<String, AuthError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || passwords::hash_password(&password))
        .await
        .map_err(|e| AuthError::Internal(e.to_string()))?
}

async fn verify_blocking(stored: &str, password: &str) -> Result<PasswordCheck, AuthError> {
    let stored = stored.to_string();
    let password = password.to_string();
    tokio::task::spawn_blocking(move || passwords::verify_password(&stored, &password))
        .await
        .map_err(|e| AuthError::Internal(e.to_string()))?
}
