//! Persistence for users and tasks.
//!
//! # Database: `taskmaster`
//!
//! ## Tables
//!
//! - `app_user` - Accounts (email unique, argon2 password hash, role)
//! - `task` - Tasks, with `assigned_to INTEGER[]` holding user ids
//!
//! # Stores
//!
//! Handlers reach storage through the [`UserStore`] and [`TaskStore`] traits.
//! [`PgUserStore`]/[`PgTaskStore`] are the production implementations;
//! [`MemoryStore`] keeps everything in process and backs the test suites.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p taskmaster-cli -- migrate
//! ```

pub mod memory;
pub mod tasks;
pub mod users;

use std::collections::BTreeSet;
use std::time::Duration;

use futures::future::BoxFuture;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use taskmaster_core::{Email, Role, Task, TaskFields, TaskFilter, TaskId, TaskStatus, UserId};

use crate::models::{NewUser, User};

pub use memory::MemoryStore;
pub use tasks::PgTaskStore;
pub use users::PgUserStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Account storage.
pub trait UserStore: Send + Sync {
    /// Insert a user.
    ///
    /// Fails with [`RepositoryError::Conflict`] when the email is taken.
    fn insert(&self, user: NewUser) -> BoxFuture<'_, Result<User, RepositoryError>>;

    fn get_by_id(&self, id: UserId) -> BoxFuture<'_, Result<Option<User>, RepositoryError>>;

    fn get_by_email<'a>(
        &'a self,
        email: &'a Email,
    ) -> BoxFuture<'a, Result<Option<User>, RepositoryError>>;

    /// A user together with their stored password hash.
    fn get_credentials<'a>(
        &'a self,
        email: &'a Email,
    ) -> BoxFuture<'a, Result<Option<(User, String)>, RepositoryError>>;

    /// All users, ordered by id.
    fn list(&self) -> BoxFuture<'_, Result<Vec<User>, RepositoryError>>;

    /// Change a user's role. `None` when the user does not exist.
    fn set_role(
        &self,
        id: UserId,
        role: Role,
    ) -> BoxFuture<'_, Result<Option<User>, RepositoryError>>;
}

/// Task storage.
///
/// Every mutating method works on a single task and returns `None` when the
/// id does not exist. Concurrent writers to one task are last-writer-wins.
pub trait TaskStore: Send + Sync {
    fn insert(
        &self,
        fields: TaskFields,
        assigned_to: BTreeSet<UserId>,
    ) -> BoxFuture<'_, Result<Task, RepositoryError>>;

    fn get(&self, id: TaskId) -> BoxFuture<'_, Result<Option<Task>, RepositoryError>>;

    /// All tasks, ordered by id.
    fn list(&self) -> BoxFuture<'_, Result<Vec<Task>, RepositoryError>>;

    /// Tasks matching `filter`, ordered by id.
    fn query<'a>(
        &'a self,
        filter: &'a TaskFilter,
    ) -> BoxFuture<'a, Result<Vec<Task>, RepositoryError>>;

    /// Replace the editable fields of a task.
    fn replace(
        &self,
        id: TaskId,
        fields: TaskFields,
    ) -> BoxFuture<'_, Result<Option<Task>, RepositoryError>>;

    fn set_status(
        &self,
        id: TaskId,
        status: TaskStatus,
    ) -> BoxFuture<'_, Result<Option<Task>, RepositoryError>>;

    /// Replace the assignee set wholesale.
    fn set_assignees(
        &self,
        id: TaskId,
        assigned_to: BTreeSet<UserId>,
    ) -> BoxFuture<'_, Result<Option<Task>, RepositoryError>>;

    /// Remove a task, returning it as it was.
    fn delete(&self, id: TaskId) -> BoxFuture<'_, Result<Option<Task>, RepositoryError>>;

    /// Check that the backing storage is reachable.
    fn ping(&self) -> BoxFuture<'_, Result<(), RepositoryError>>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map a unique violation to [`RepositoryError::Conflict`].
pub(crate) fn conflict_on_unique(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}
