//! Task service.
//!
//! Every operation takes the [`Caller`] it runs for. Admin-only operations
//! check the role first; operations on one task load it, answer `NotFound`
//! when it is absent, and only then consult the access policy.

mod error;

pub use error::TaskError;

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::instrument;

use taskmaster_core::{
    Caller, Role, Task, TaskFields, TaskFilter, TaskId, TaskStatus, UserId, check_access,
    require_role,
};

use crate::db::TaskStore;

/// Task operations, gated by role and assignment.
#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn TaskStore>,
}

impl std::fmt::Debug for TaskService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskService").finish_non_exhaustive()
    }
}

impl TaskService {
    #[must_use]
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }

    /// Create a task. Admin only.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-admins, `InvalidArgument` for a blank or
    /// overlong title.
    #[instrument(skip(self, fields), fields(caller = %caller.id))]
    pub async fn create(
        &self,
        caller: &Caller,
        fields: TaskFields,
        assigned_to: BTreeSet<UserId>,
    ) -> Result<Task, TaskError> {
        require_role(caller, Role::Admin)?;
        let fields = fields.validate().map_err(TaskError::InvalidArgument)?;

        let task = self.store.insert(fields, assigned_to).await?;
        tracing::info!(task_id = %task.id, "task created");
        Ok(task)
    }

    /// Replace a task's assignees. Admin only.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-admins, `NotFound` for an unknown task.
    #[instrument(skip(self), fields(caller = %caller.id))]
    pub async fn assign(
        &self,
        caller: &Caller,
        id: TaskId,
        user_ids: BTreeSet<UserId>,
    ) -> Result<Task, TaskError> {
        require_role(caller, Role::Admin)?;
        self.store
            .set_assignees(id, user_ids)
            .await?
            .ok_or(TaskError::NotFound(id))
    }

    /// Every task. Admin only.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-admins.
    pub async fn list_all(&self, caller: &Caller) -> Result<Vec<Task>, TaskError> {
        require_role(caller, Role::Admin)?;
        Ok(self.store.list().await?)
    }

    /// One task, if the caller may see it.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown task, `Forbidden` when the caller is
    /// neither an admin nor an assignee.
    pub async fn find_by_id(&self, caller: &Caller, id: TaskId) -> Result<Task, TaskError> {
        let task = self.store.get(id).await?.ok_or(TaskError::NotFound(id))?;
        check_access(caller, &task)?;
        Ok(task)
    }

    /// Replace a task's editable fields.
    ///
    /// # Errors
    ///
    /// As [`Self::find_by_id`], plus `InvalidArgument` for a bad title.
    #[instrument(skip(self, fields), fields(caller = %caller.id))]
    pub async fn update(
        &self,
        caller: &Caller,
        id: TaskId,
        fields: TaskFields,
    ) -> Result<Task, TaskError> {
        self.find_by_id(caller, id).await?;
        let fields = fields.validate().map_err(TaskError::InvalidArgument)?;

        self.store
            .replace(id, fields)
            .await?
            .ok_or(TaskError::NotFound(id))
    }

    /// Set a task's status. Setting the current status again is a no-op.
    ///
    /// # Errors
    ///
    /// As [`Self::find_by_id`].
    #[instrument(skip(self), fields(caller = %caller.id))]
    pub async fn change_status(
        &self,
        caller: &Caller,
        id: TaskId,
        status: TaskStatus,
    ) -> Result<Task, TaskError> {
        let task = self.find_by_id(caller, id).await?;
        if task.status == status {
            return Ok(task);
        }

        self.store
            .set_status(id, status)
            .await?
            .ok_or(TaskError::NotFound(id))
    }

    /// Delete a task the caller has access to. Assignees may delete.
    ///
    /// # Errors
    ///
    /// As [`Self::find_by_id`].
    #[instrument(skip(self), fields(caller = %caller.id))]
    pub async fn delete(&self, caller: &Caller, id: TaskId) -> Result<Task, TaskError> {
        self.find_by_id(caller, id).await?;
        self.remove(id).await
    }

    /// Delete any task. Admin only.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-admins, `NotFound` for an unknown task.
    #[instrument(skip(self), fields(caller = %caller.id))]
    pub async fn admin_delete(&self, caller: &Caller, id: TaskId) -> Result<Task, TaskError> {
        require_role(caller, Role::Admin)?;
        self.remove(id).await
    }

    /// Tasks matching the raw query parameters, within the caller's scope.
    ///
    /// # Errors
    ///
    /// `Query` when a parameter does not parse.
    pub async fn filter(
        &self,
        caller: &Caller,
        status: Option<&str>,
        priority: Option<&str>,
        due_date: Option<&str>,
    ) -> Result<Vec<Task>, TaskError> {
        let filter = TaskFilter::build(status, priority, due_date, caller)?;
        Ok(self.store.query(&filter).await?)
    }

    async fn remove(&self, id: TaskId) -> Result<Task, TaskError> {
        let task = self.store.delete(id).await?.ok_or(TaskError::NotFound(id))?;
        tracing::info!(task_id = %task.id, "task deleted");
        Ok(task)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use taskmaster_core::{PolicyError, QueryError, TaskPriority};

    use super::*;
    use crate::db::MemoryStore;

    const ADMIN: Caller = Caller {
        id: UserId::new(1),
        role: Role::Admin,
    };
    const ALICE: Caller = Caller {
        id: UserId::new(2),
        role: Role::User,
    };
    const BOB: Caller = Caller {
        id: UserId::new(3),
        role: Role::User,
    };

    fn service() -> TaskService {
        TaskService::new(Arc::new(MemoryStore::new()))
    }

    async fn task_for(service: &TaskService, owner: &Caller, title: &str) -> Task {
        service
            .create(&ADMIN, TaskFields::titled(title), BTreeSet::from([owner.id]))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_then_find_round_trip() {
        let service = service();
        let mut fields = TaskFields::titled("Write report");
        fields.description = Some("quarterly".to_owned());
        fields.priority = TaskPriority::High;
        fields.due_date = NaiveDate::from_ymd_opt(2024, 1, 15);

        let created = service
            .create(&ADMIN, fields.clone(), BTreeSet::from([ALICE.id]))
            .await
            .unwrap();
        let found = service.find_by_id(&ALICE, created.id).await.unwrap();

        assert_eq!(found, created);
        assert_eq!(found.title, fields.title);
        assert_eq!(found.description, fields.description);
        assert_eq!(found.priority, TaskPriority::High);
        assert_eq!(found.due_date, fields.due_date);
        assert!(found.is_assigned_to(ALICE.id));
    }

    #[tokio::test]
    async fn test_admin_only_operations_reject_users() {
        let service = service();
        let task = task_for(&service, &ALICE, "t").await;

        let forbidden = |r: Result<_, TaskError>| {
            matches!(
                r,
                Err(TaskError::Forbidden(PolicyError::MissingRole {
                    required: Role::Admin
                }))
            )
        };

        assert!(forbidden(
            service
                .create(&ALICE, TaskFields::titled("x"), BTreeSet::new())
                .await
                .map(|_| ())
        ));
        assert!(forbidden(service.list_all(&ALICE).await.map(|_| ())));
        assert!(forbidden(
            service
                .assign(&ALICE, task.id, BTreeSet::from([ALICE.id]))
                .await
                .map(|_| ())
        ));
        assert!(forbidden(service.admin_delete(&ALICE, task.id).await.map(|_| ())));
    }

    #[tokio::test]
    async fn test_non_assignee_is_forbidden_per_task() {
        let service = service();
        let task = task_for(&service, &ALICE, "alice's").await;
        let not_assigned =
            |r: Result<Task, TaskError>| matches!(r, Err(TaskError::Forbidden(PolicyError::NotAssigned)));

        assert!(not_assigned(service.find_by_id(&BOB, task.id).await));
        assert!(not_assigned(
            service.update(&BOB, task.id, TaskFields::titled("mine now")).await
        ));
        assert!(not_assigned(
            service.change_status(&BOB, task.id, TaskStatus::Completed).await
        ));
        assert!(not_assigned(service.delete(&BOB, task.id).await));

        // nothing changed
        assert_eq!(service.find_by_id(&ALICE, task.id).await.unwrap(), task);
    }

    #[tokio::test]
    async fn test_admin_may_act_on_any_task() {
        let service = service();
        let task = task_for(&service, &ALICE, "alice's").await;

        service.find_by_id(&ADMIN, task.id).await.unwrap();
        let updated = service
            .update(&ADMIN, task.id, TaskFields::titled("renamed"))
            .await
            .unwrap();
        assert_eq!(updated.title, "renamed");
        assert!(updated.is_assigned_to(ALICE.id));

        service
            .change_status(&ADMIN, task.id, TaskStatus::OnHold)
            .await
            .unwrap();
        service.delete(&ADMIN, task.id).await.unwrap();
        assert!(matches!(
            service.find_by_id(&ADMIN, task.id).await,
            Err(TaskError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_change_status_is_idempotent() {
        let service = service();
        let task = task_for(&service, &ALICE, "t").await;

        let first = service
            .change_status(&ALICE, task.id, TaskStatus::Completed)
            .await
            .unwrap();
        let second = service
            .change_status(&ALICE, task.id, TaskStatus::Completed)
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(second.status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_missing_task_is_not_found_before_forbidden() {
        let service = service();
        let missing = TaskId::new(404);
        assert!(matches!(
            service.find_by_id(&BOB, missing).await,
            Err(TaskError::NotFound(id)) if id == missing
        ));
        assert!(matches!(
            service.assign(&ADMIN, missing, BTreeSet::new()).await,
            Err(TaskError::NotFound(_))
        ));
        assert!(matches!(
            service.admin_delete(&ADMIN, missing).await,
            Err(TaskError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_blank_title_rejected() {
        let service = service();
        assert!(matches!(
            service
                .create(&ADMIN, TaskFields::titled("  "), BTreeSet::new())
                .await,
            Err(TaskError::InvalidArgument(_))
        ));

        let task = task_for(&service, &ALICE, "t").await;
        assert!(matches!(
            service.update(&ALICE, task.id, TaskFields::titled("")).await,
            Err(TaskError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_assign_replaces_assignees() {
        let service = service();
        let task = task_for(&service, &ALICE, "t").await;

        let reassigned = service
            .assign(&ADMIN, task.id, BTreeSet::from([BOB.id]))
            .await
            .unwrap();
        assert_eq!(reassigned.assigned_to, BTreeSet::from([BOB.id]));

        service.find_by_id(&BOB, task.id).await.unwrap();
        assert!(matches!(
            service.find_by_id(&ALICE, task.id).await,
            Err(TaskError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_filter_is_scoped_to_caller() {
        let service = service();
        task_for(&service, &ALICE, "a1").await;
        task_for(&service, &ALICE, "a2").await;
        task_for(&service, &BOB, "b1").await;

        let mine = service.filter(&ALICE, None, None, None).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|t| t.is_assigned_to(ALICE.id)));

        let everything = service.filter(&ADMIN, None, None, None).await.unwrap();
        assert_eq!(everything.len(), 3);

        assert!(matches!(
            service.filter(&ALICE, Some("bogus"), None, None).await,
            Err(TaskError::Query(QueryError::InvalidStatus(_)))
        ));
    }

    #[tokio::test]
    async fn test_assignee_may_delete() {
        let service = service();
        let task = task_for(&service, &ALICE, "t").await;
        let deleted = service.delete(&ALICE, task.id).await.unwrap();
        assert_eq!(deleted.id, task.id);
        assert!(service.list_all(&ADMIN).await.unwrap().is_empty());
    }
}
