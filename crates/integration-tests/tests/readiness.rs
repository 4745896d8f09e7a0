//! `/health/ready` when the task store cannot be reached.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::http::StatusCode;
use futures::future::BoxFuture;

use taskmaster_api::db::{RepositoryError, TaskStore};
use taskmaster_core::{Task, TaskFields, TaskFilter, TaskId, TaskStatus, UserId};
use taskmaster_integration_tests::TestContext;

/// A task store whose database is gone.
struct OfflineTaskStore;

fn offline<T: Send + 'static>() -> BoxFuture<'static, Result<T, RepositoryError>> {
    Box::pin(async { Err(RepositoryError::Database(sqlx::Error::PoolTimedOut)) })
}

impl TaskStore for OfflineTaskStore {
    fn insert(
        &self,
        _fields: TaskFields,
        _assigned_to: BTreeSet<UserId>,
    ) -> BoxFuture<'_, Result<Task, RepositoryError>> {
        offline()
    }

    fn get(&self, _id: TaskId) -> BoxFuture<'_, Result<Option<Task>, RepositoryError>> {
        offline()
    }

    fn list(&self) -> BoxFuture<'_, Result<Vec<Task>, RepositoryError>> {
        offline()
    }

    fn query<'a>(
        &'a self,
        _filter: &'a TaskFilter,
    ) -> BoxFuture<'a, Result<Vec<Task>, RepositoryError>> {
        offline()
    }

    fn replace(
        &self,
        _id: TaskId,
        _fields: TaskFields,
    ) -> BoxFuture<'_, Result<Option<Task>, RepositoryError>> {
        offline()
    }

    fn set_status(
        &self,
        _id: TaskId,
        _status: TaskStatus,
    ) -> BoxFuture<'_, Result<Option<Task>, RepositoryError>> {
        offline()
    }

    fn set_assignees(
        &self,
        _id: TaskId,
        _assigned_to: BTreeSet<UserId>,
    ) -> BoxFuture<'_, Result<Option<Task>, RepositoryError>> {
        offline()
    }

    fn delete(&self, _id: TaskId) -> BoxFuture<'_, Result<Option<Task>, RepositoryError>> {
        offline()
    }

    fn ping(&self) -> BoxFuture<'_, Result<(), RepositoryError>> {
        offline()
    }
}

#[tokio::test]
async fn test_readiness_is_503_when_store_is_down() {
    let ctx = TestContext::with_task_store(Arc::new(OfflineTaskStore));

    assert_eq!(
        ctx.get("/health/ready", None).await.status,
        StatusCode::SERVICE_UNAVAILABLE
    );
    assert_eq!(ctx.get("/health", None).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_store_failure_is_opaque_500() {
    let ctx = TestContext::with_task_store(Arc::new(OfflineTaskStore));
    ctx.create_user("root", "admin@x.com", "secret1", taskmaster_core::Role::Admin)
        .await;
    let cookie = ctx.login("admin@x.com", "secret1").await;

    let response = ctx.get("/tasks/all", Some(&cookie)).await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["message"], "Internal server error");
}
