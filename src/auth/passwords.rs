//! One-way password hashing. New hashes are argon2 PHC strings; bare
//! SHA-256 hex digests from older installations still verify.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use once_cell::sync::Lazy;
use sha2::{Digest, Sha256};

use super::error::AuthError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordCheck {
    Valid,
    /// Correct, but stored in the legacy format and should be rehashed.
    ValidLegacy,
    Invalid,
}

impl PasswordCheck {
    pub fn is_valid(self) -> bool {
        !matches!(self, PasswordCheck::Invalid)
    }
}

/// Verified against when the username does not exist, so both paths do the same work.
static DUMMY_HASH: Lazy<Option<String>> =
    Lazy::new(|| hash_password(&uuid::Uuid::new_v4().to_string()).ok());

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Internal(format!("password hashing failed: {}", e)))
}

pub fn verify_password(stored: &str, password: &str) -> Result<PasswordCheck, AuthError> {
    if is_legacy_digest(stored) {
        let digest = format!("{:x}", Sha256::digest(password.as_bytes()));
        return Ok(if constant_time_eq(digest.as_bytes(), stored.to_ascii_lowercase().as_bytes()) {
            PasswordCheck::ValidLegacy
        } else {
            PasswordCheck::Invalid
        });
    }

    let parsed = PasswordHash::new(stored)
        .map_err(|e| AuthError::Internal(format!("stored password hash is unreadable: {}", e)))?;

    Ok(match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => PasswordCheck::Valid,
        Err(argon2::password_hash::Error::Password) => PasswordCheck::Invalid,
        Err(e) => return Err(AuthError::Internal(format!("password verification failed: {}", e))),
    })
}

/// Burn one verification's worth of work for an unknown username.
pub fn verify_dummy(password: &str) {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(hash, password);
    }
}

fn is_legacy_digest(stored: &str) -> bool {
    stored.len() == 64 && stored.chars().all(|c| c.is_ascii_hexdigit())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
