//! Task service error types.

use thiserror::Error;

use taskmaster_core::{PolicyError, QueryError, TaskId};

use crate::db::RepositoryError;

/// Errors that can occur during task operations.
#[derive(Debug, Error)]
pub enum TaskError {
    /// No task with this id.
    #[error("task {0} not found")]
    NotFound(TaskId),

    /// The caller may not perform this operation.
    #[error(transparent)]
    Forbidden(#[from] PolicyError),

    /// Rejected input, such as a blank title.
    #[error("{0}")]
    InvalidArgument(String),

    /// Rejected filter parameters.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
