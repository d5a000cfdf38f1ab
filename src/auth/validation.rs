//! Input rules for account management.

use super::error::AuthError;

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// 3-50 characters of letters, digits, `_` or `-`, starting alphanumeric.
pub fn validate_username(username: &str) -> Result<(), AuthError> {
    let invalid = |msg: &str| Err(AuthError::InvalidInput(msg.to_string()));

    if username.len() < 3 {
        return invalid("Username must be at least 3 characters");
    }
    if username.len() > 50 {
        return invalid("Username must be less than 50 characters");
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return invalid("Username can only contain letters, numbers, underscore, and hyphen");
    }
    if !username.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return invalid("Username must start with a letter or number");
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::InvalidInput(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), AuthError> {
    let invalid = || Err(AuthError::InvalidInput("Invalid email format".to_string()));

    let Some((local, domain)) = email.split_once('@') else {
        return invalid();
    };
    if local.is_empty() || domain.contains('@') || email.chars().any(char::is_whitespace) {
        return invalid();
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) if !host.is_empty() && !tld.is_empty() => Ok(()),
        _ => invalid(),
    }
}
