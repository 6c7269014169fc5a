// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Registration and login input validation.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

use crate::auth::MIN_PASSWORD_LENGTH;

// Common validation constants
const MIN_USERNAME_LENGTH: usize = 5;
const MAX_USERNAME_LENGTH: usize = 50;
const MAX_PASSWORD_LENGTH: usize = 128;
const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321 SMTP limit

// Regex patterns for validation
static USERNAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_.-]+$").unwrap());
static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());

/// Possible validation errors
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Invalid password: {0}")]
    InvalidPassword(String),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Invalid role: {0}")]
    InvalidRole(String),
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate a username: length bounds and a conservative character set.
pub fn validate_username(username: &str) -> ValidationResult<&str> {
    if username.len() < MIN_USERNAME_LENGTH {
        return Err(ValidationError::InvalidUsername(format!(
            "must be at least {MIN_USERNAME_LENGTH} characters"
        )));
    }
    if username.len() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::InvalidUsername(format!(
            "must be at most {MAX_USERNAME_LENGTH} characters"
        )));
    }
    if !USERNAME_REGEX.is_match(username) {
        return Err(ValidationError::InvalidUsername(
            "contains disallowed characters".to_string(),
        ));
    }
    Ok(username)
}

/// Validate a password against the length policy. The content policy is
/// deliberately minimal; the hash function does the heavy lifting.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::InvalidPassword(format!(
            "must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::InvalidPassword(format!(
            "must be at most {MAX_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Validate email syntax.
pub fn validate_email(email: &str) -> ValidationResult<&str> {
    if email.len() > MAX_EMAIL_LENGTH || !EMAIL_REGEX.is_match(email) {
        return Err(ValidationError::InvalidEmail(
            "not a valid email address".to_string(),
        ));
    }
    Ok(email)
}

/// Validate a numeric role id from a registration payload.
pub fn validate_role_id(role_id: u8) -> ValidationResult<savour_common::Role> {
    savour_common::Role::try_from(role_id).map_err(ValidationError::InvalidRole)
}

#[cfg(test)]
mod tests {
    use super::*;
    use savour_common::Role;

    #[test]
    fn username_length_bounds() {
        assert!(validate_username("abcd").is_err());
        assert!(validate_username("alice").is_ok());
        assert!(validate_username(&"x".repeat(51)).is_err());
    }

    #[test]
    fn username_character_set() {
        assert!(validate_username("al ice").is_err());
        assert!(validate_username("alice<script>").is_err());
        assert!(validate_username("alice_01.x-y").is_ok());
    }

    #[test]
    fn password_length_bounds() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("longenough").is_ok());
        assert!(validate_password(&"x".repeat(129)).is_err());
    }

    #[test]
    fn email_syntax() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("a@b").is_err());
    }

    #[test]
    fn role_ids() {
        assert_eq!(validate_role_id(1).unwrap(), Role::Admin);
        assert_eq!(validate_role_id(2).unwrap(), Role::Staff);
        assert_eq!(validate_role_id(3).unwrap(), Role::Other);
        assert!(validate_role_id(0).is_err());
        assert!(validate_role_id(4).is_err());
    }
}
