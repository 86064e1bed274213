use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A signed-in user as reported by the authentication provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthSession {
    pub uid: String,
    pub email: String,
    pub id_token: String,
    pub refresh_token: String,
}

/// Authentication failures. The first four are the fixed set of user-facing
/// messages; anything else the provider reports lands in `Provider`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("email cannot be empty")]
    EmptyEmail,
    #[error("invalid email format")]
    InvalidEmail,
    #[error("password cannot be empty")]
    EmptyPassword,
    #[error("password must be at least 6 characters long")]
    WeakPassword,
    #[error("this email is already in use")]
    EmailInUse,
    #[error("authentication failed: {reason}")]
    Provider { reason: String },
}

/// Contract for the external authentication service, keyed by
/// email/password.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;
    async fn sign_out(&self, session: &AuthSession) -> Result<(), AuthError>;
    async fn send_password_reset(&self, email: &str) -> Result<(), AuthError>;
}

/// Pre-submission email check: non-empty, no whitespace, a single `@`, and
/// a dot somewhere inside the domain part.
pub fn validate_email(email: &str) -> Result<(), AuthError> {
    if email.is_empty() {
        return Err(AuthError::EmptyEmail);
    }
    if email.chars().any(char::is_whitespace) {
        return Err(AuthError::InvalidEmail);
    }
    let Some((local, domain)) = email.split_once('@') else {
        return Err(AuthError::InvalidEmail);
    };
    if local.is_empty() || domain.contains('@') {
        return Err(AuthError::InvalidEmail);
    }
    let interior_dot = domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len());
    if !interior_dot {
        return Err(AuthError::InvalidEmail);
    }
    Ok(())
}

/// Pre-submission password check: non-empty and at least 6 characters.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.is_empty() {
        return Err(AuthError::EmptyPassword);
    }
    if password.chars().count() < 6 {
        return Err(AuthError::WeakPassword);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_addresses() {
        assert_eq!(validate_email("user@example.com"), Ok(()));
        assert_eq!(validate_email("a.b+c@sub.domain.org"), Ok(()));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert_eq!(validate_email(""), Err(AuthError::EmptyEmail));
        assert_eq!(validate_email("no-at-sign"), Err(AuthError::InvalidEmail));
        assert_eq!(validate_email("user@nodot"), Err(AuthError::InvalidEmail));
        assert_eq!(validate_email("@example.com"), Err(AuthError::InvalidEmail));
        assert_eq!(
            validate_email("user name@example.com"),
            Err(AuthError::InvalidEmail)
        );
        assert_eq!(
            validate_email("user@host@example.com"),
            Err(AuthError::InvalidEmail)
        );
    }

    #[test]
    fn password_needs_six_characters() {
        assert_eq!(validate_password(""), Err(AuthError::EmptyPassword));
        assert_eq!(validate_password("12345"), Err(AuthError::WeakPassword));
        assert_eq!(validate_password("123456"), Ok(()));
    }
}
