//! In-process store.
//!
//! Implements both [`UserStore`] and [`TaskStore`] over maps guarded by a
//! single `RwLock`. Ids are handed out sequentially from 1, like a
//! `SERIAL` column.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use futures::future::BoxFuture;
use tokio::sync::RwLock;

use taskmaster_core::{
    Email, Role, Task, TaskFields, TaskFilter, TaskId, TaskStatus, UserId,
};

use super::{RepositoryError, TaskStore, UserStore};
use crate::models::{NewUser, User};

#[derive(Debug, Default)]
struct Inner {
    users: BTreeMap<UserId, (User, String)>,
    tasks: BTreeMap<TaskId, Task>,
    next_user: i32,
    next_task: i32,
}

impl Inner {
    fn update_task(&mut self, id: TaskId, f: impl FnOnce(&mut Task)) -> Option<Task> {
        let task = self.tasks.get_mut(&id)?;
        f(task);
        task.updated_at = Utc::now();
        Some(task.clone())
    }
}

/// Users and tasks held in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for MemoryStore {
    fn insert(&self, user: NewUser) -> BoxFuture<'_, Result<User, RepositoryError>> {
        Box::pin(async move {
            let mut inner = self.inner.write().await;
            if inner.users.values().any(|(u, _)| u.email == user.email) {
                return Err(RepositoryError::Conflict("email already exists".to_owned()));
            }

            inner.next_user += 1;
            let now = Utc::now();
            let created = User {
                id: UserId::new(inner.next_user),
                username: user.username,
                email: user.email,
                role: user.role,
                created_at: now,
                updated_at: now,
            };
            inner
                .users
                .insert(created.id, (created.clone(), user.password_hash));
            Ok(created)
        })
    }

    fn get_by_id(&self, id: UserId) -> BoxFuture<'_, Result<Option<User>, RepositoryError>> {
        Box::pin(async move {
            let inner = self.inner.read().await;
            Ok(inner.users.get(&id).map(|(u, _)| u.clone()))
        })
    }

    fn get_by_email<'a>(
        &'a self,
        email: &'a Email,
    ) -> BoxFuture<'a, Result<Option<User>, RepositoryError>> {
        Box::pin(async move {
            Ok(self
                .get_credentials(email)
                .await?
                .map(|(user, _)| user))
        })
    }

    fn get_credentials<'a>(
        &'a self,
        email: &'a Email,
    ) -> BoxFuture<'a, Result<Option<(User, String)>, RepositoryError>> {
        Box::pin(async move {
            let inner = self.inner.read().await;
            Ok(inner
                .users
                .values()
                .find(|(u, _)| &u.email == email)
                .cloned())
        })
    }

    fn list(&self) -> BoxFuture<'_, Result<Vec<User>, RepositoryError>> {
        Box::pin(async move {
            let inner = self.inner.read().await;
            Ok(inner.users.values().map(|(u, _)| u.clone()).collect())
        })
    }

    fn set_role(
        &self,
        id: UserId,
        role: Role,
    ) -> BoxFuture<'_, Result<Option<User>, RepositoryError>> {
        Box::pin(async move {
            let mut inner = self.inner.write().await;
            Ok(inner.users.get_mut(&id).map(|(user, _)| {
                user.role = role;
                user.updated_at = Utc::now();
                user.clone()
            }))
        })
    }
}

impl TaskStore for MemoryStore {
    fn insert(
        &self,
        fields: TaskFields,
        assigned_to: BTreeSet<UserId>,
    ) -> BoxFuture<'_, Result<Task, RepositoryError>> {
        Box::pin(async move {
            let mut inner = self.inner.write().await;
            inner.next_task += 1;
            let now = Utc::now();
            let task = Task {
                id: TaskId::new(inner.next_task),
                title: fields.title,
                description: fields.description,
                status: fields.status,
                priority: fields.priority,
                due_date: fields.due_date,
                assigned_to,
                created_at: now,
                updated_at: now,
            };
            inner.tasks.insert(task.id, task.clone());
            Ok(task)
        })
    }

    fn get(&self, id: TaskId) -> BoxFuture<'_, Result<Option<Task>, RepositoryError>> {
        Box::pin(async move { Ok(self.inner.read().await.tasks.get(&id).cloned()) })
    }

    fn list(&self) -> BoxFuture<'_, Result<Vec<Task>, RepositoryError>> {
        Box::pin(async move { Ok(self.inner.read().await.tasks.values().cloned().collect()) })
    }

    fn query<'a>(
        &'a self,
        filter: &'a TaskFilter,
    ) -> BoxFuture<'a, Result<Vec<Task>, RepositoryError>> {
        Box::pin(async move {
            let inner = self.inner.read().await;
            Ok(inner
                .tasks
                .values()
                .filter(|task| filter.matches(task))
                .cloned()
                .collect())
        })
    }

    fn replace(
        &self,
        id: TaskId,
        fields: TaskFields,
    ) -> BoxFuture<'_, Result<Option<Task>, RepositoryError>> {
        Box::pin(async move {
            let mut inner = self.inner.write().await;
            Ok(inner.update_task(id, |task| {
                task.title = fields.title;
                task.description = fields.description;
                task.status = fields.status;
                task.priority = fields.priority;
                task.due_date = fields.due_date;
            }))
        })
    }

    fn set_status(
        &self,
        id: TaskId,
        status: TaskStatus,
    ) -> BoxFuture<'_, Result<Option<Task>, RepositoryError>> {
        Box::pin(async move {
            let mut inner = self.inner.write().await;
            Ok(inner.update_task(id, |task| task.status = status))
        })
    }

    fn set_assignees(
        &self,
        id: TaskId,
        assigned_to: BTreeSet<UserId>,
    ) -> BoxFuture<'_, Result<Option<Task>, RepositoryError>> {
        Box::pin(async move {
            let mut inner = self.inner.write().await;
            Ok(inner.update_task(id, |task| task.assigned_to = assigned_to))
        })
    }

    fn delete(&self, id: TaskId) -> BoxFuture<'_, Result<Option<Task>, RepositoryError>> {
        Box::pin(async move { Ok(self.inner.write().await.tasks.remove(&id)) })
    }

    fn ping(&self) -> BoxFuture<'_, Result<(), RepositoryError>> {
        Box::pin(async { Ok(()) })
    }
}
