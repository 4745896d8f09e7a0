//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] taskmaster_core::EmailError),

    /// Username blank or too long.
    #[error("invalid username: {0}")]
    InvalidUsername(String),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// No session token was presented.
    #[error("authentication required")]
    MissingToken,

    /// Session token malformed, forged or expired.
    #[error("invalid or expired session")]
    InvalidToken,

    /// Signing a session token failed.
    #[error("token encoding error: {0}")]
    TokenEncoding(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
