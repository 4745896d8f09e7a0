//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! tm-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `TASKS_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! # Migration Files
//!
//! Migrations live in `crates/api/migrations/` and are embedded at compile
//! time.

use super::{CliError, connect};

/// Run all pending migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CliError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../api/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
