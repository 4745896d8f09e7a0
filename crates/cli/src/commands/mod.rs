//! Subcommand implementations.

pub mod migrate;
pub mod seed;
pub mod user;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use taskmaster_api::db::{RepositoryError, create_pool};
use taskmaster_api::services::AuthError;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Repository operation failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// User input rejected by the authenticator's rules.
    #[error("{0}")]
    Auth(#[from] AuthError),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: admin, user")]
    InvalidRole(String),

    /// No user with this email.
    #[error("No user with email: {0}")]
    UnknownUser(String),

    /// Seed file unreadable.
    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// Seed file malformed.
    #[error("Invalid seed file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Seed file content rejected.
    #[error("Invalid task {index} in seed file: {reason}")]
    InvalidSeed { index: usize, reason: String },
}

/// Connect to the database named by `TASKS_DATABASE_URL` (or `DATABASE_URL`).
pub async fn connect() -> Result<PgPool, CliError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("TASKS_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CliError::MissingEnvVar("TASKS_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    Ok(create_pool(&database_url).await?)
}
