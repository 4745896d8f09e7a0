//! Task repository backed by `PostgreSQL`.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use futures::future::BoxFuture;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;

use taskmaster_core::{
    Task, TaskFields, TaskFilter, TaskId, TaskPriority, TaskStatus, UserId,
};

use super::{RepositoryError, TaskStore};

const TASK_COLUMNS: &str =
    "id, title, description, status, priority, due_date, assigned_to, created_at, updated_at";

/// Database row for `task`.
#[derive(Debug, sqlx::FromRow)]
struct TaskRow {
    id: TaskId,
    title: String,
    description: Option<String>,
    status: TaskStatus,
    priority: TaskPriority,
    due_date: Option<NaiveDate>,
    assigned_to: Vec<UserId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            status: row.status,
            priority: row.priority,
            due_date: row.due_date,
            assigned_to: row.assigned_to.into_iter().collect(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// `PostgreSQL` implementation of [`TaskStore`].
#[derive(Debug, Clone)]
pub struct PgTaskStore {
    pool: PgPool,
}

impl PgTaskStore {
    /// Create a new task store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_optional(
        &self,
        sql: &str,
        id: TaskId,
    ) -> Result<Option<Task>, RepositoryError> {
        let row = sqlx::query_as::<_, TaskRow>(sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Task::from))
    }
}

/// Append the filter's criteria as `AND` clauses.
fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &TaskFilter) {
    if let Some(user) = filter.assignee() {
        qb.push(" AND assigned_to @> ARRAY[")
            .push_bind(user)
            .push("]");
    }
    if let Some(status) = filter.status() {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(priority) = filter.priority() {
        qb.push(" AND priority = ").push_bind(priority);
    }
    if let Some(due) = filter.due() {
        let (start, end) = due.bounds();
        qb.push(" AND due_date BETWEEN ")
            .push_bind(start)
            .push(" AND ")
            .push_bind(end);
    }
}

impl TaskStore for PgTaskStore {
    #[instrument(skip(self, fields), fields(title = %fields.title))]
    fn insert(
        &self,
        fields: TaskFields,
        assigned_to: BTreeSet<UserId>,
    ) -> BoxFuture<'_, Result<Task, RepositoryError>> {
        Box::pin(async move {
            let assignees: Vec<UserId> = assigned_to.into_iter().collect();
            let row = sqlx::query_as::<_, TaskRow>(&format!(
                r"
                INSERT INTO task (title, description, status, priority, due_date, assigned_to)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING {TASK_COLUMNS}
                "
            ))
            .bind(&fields.title)
            .bind(&fields.description)
            .bind(fields.status)
            .bind(fields.priority)
            .bind(fields.due_date)
            .bind(&assignees)
            .fetch_one(&self.pool)
            .await?;

            Ok(Task::from(row))
        })
    }

    fn get(&self, id: TaskId) -> BoxFuture<'_, Result<Option<Task>, RepositoryError>> {
        Box::pin(async move {
            self.fetch_optional(&format!("SELECT {TASK_COLUMNS} FROM task WHERE id = $1"), id)
                .await
        })
    }

    fn list(&self) -> BoxFuture<'_, Result<Vec<Task>, RepositoryError>> {
        Box::pin(async move {
            let rows = sqlx::query_as::<_, TaskRow>(&format!(
                "SELECT {TASK_COLUMNS} FROM task ORDER BY id"
            ))
            .fetch_all(&self.pool)
            .await?;
            Ok(rows.into_iter().map(Task::from).collect())
        })
    }

    #[instrument(skip(self))]
    fn query<'a>(
        &'a self,
        filter: &'a TaskFilter,
    ) -> BoxFuture<'a, Result<Vec<Task>, RepositoryError>> {
        Box::pin(async move {
            let mut qb = QueryBuilder::<Postgres>::new(format!(
                "SELECT {TASK_COLUMNS} FROM task WHERE TRUE"
            ));
            push_filter(&mut qb, filter);
            qb.push(" ORDER BY id");

            let rows = qb
                .build_query_as::<TaskRow>()
                .fetch_all(&self.pool)
                .await?;
            Ok(rows.into_iter().map(Task::from).collect())
        })
    }

    #[instrument(skip(self, fields))]
    fn replace(
        &self,
        id: TaskId,
        fields: TaskFields,
    ) -> BoxFuture<'_, Result<Option<Task>, RepositoryError>> {
        Box::pin(async move {
            let row = sqlx::query_as::<_, TaskRow>(&format!(
                r"
                UPDATE task
                SET title = $2, description = $3, status = $4, priority = $5,
                    due_date = $6, updated_at = NOW()
                WHERE id = $1
                RETURNING {TASK_COLUMNS}
                "
            ))
            .bind(id)
            .bind(&fields.title)
            .bind(&fields.description)
            .bind(fields.status)
            .bind(fields.priority)
            .bind(fields.due_date)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row.map(Task::from))
        })
    }

    #[instrument(skip(self))]
    fn set_status(
        &self,
        id: TaskId,
        status: TaskStatus,
    ) -> BoxFuture<'_, Result<Option<Task>, RepositoryError>> {
        Box::pin(async move {
            let row = sqlx::query_as::<_, TaskRow>(&format!(
                r"
                UPDATE task SET status = $2, updated_at = NOW()
                WHERE id = $1
                RETURNING {TASK_COLUMNS}
                "
            ))
            .bind(id)
            .bind(status)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row.map(Task::from))
        })
    }

    #[instrument(skip(self))]
    fn set_assignees(
        &self,
        id: TaskId,
        assigned_to: BTreeSet<UserId>,
    ) -> BoxFuture<'_, Result<Option<Task>, RepositoryError>> {
        Box::pin(async move {
            let assignees: Vec<UserId> = assigned_to.into_iter().collect();
            let row = sqlx::query_as::<_, TaskRow>(&format!(
                r"
                UPDATE task SET assigned_to = $2, updated_at = NOW()
                WHERE id = $1
                RETURNING {TASK_COLUMNS}
                "
            ))
            .bind(id)
            .bind(&assignees)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row.map(Task::from))
        })
    }

    #[instrument(skip(self))]
    fn delete(&self, id: TaskId) -> BoxFuture<'_, Result<Option<Task>, RepositoryError>> {
        Box::pin(async move {
            self.fetch_optional(
                &format!("DELETE FROM task WHERE id = $1 RETURNING {TASK_COLUMNS}"),
                id,
            )
            .await
        })
    }

    fn ping(&self) -> BoxFuture<'_, Result<(), RepositoryError>> {
        Box::pin(async move {
            sqlx::query("SELECT 1").execute(&self.pool).await?;
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use taskmaster_core::{Caller, Role};

    fn sql_for(filter: &TaskFilter) -> String {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT id FROM task WHERE TRUE");
        push_filter(&mut qb, filter);
        qb.sql().to_owned()
    }

    #[test]
    fn test_admin_filter_has_no_assignee_clause() {
        let admin = Caller::new(UserId::new(1), Role::Admin);
        let filter = TaskFilter::build(None, None, None, &admin).unwrap();
        assert_eq!(sql_for(&filter), "SELECT id FROM task WHERE TRUE");
    }

    #[test]
    fn test_user_filter_is_scoped_to_assignee() {
        let user = Caller::new(UserId::new(7), Role::User);
        let filter = TaskFilter::build(Some("pending"), None, None, &user).unwrap();
        assert_eq!(
            sql_for(&filter),
            "SELECT id FROM task WHERE TRUE AND assigned_to @> ARRAY[$1] AND status = $2"
        );
    }

    #[test]
    fn test_due_date_range_clause() {
        let admin = Caller::new(UserId::new(1), Role::Admin);
        let filter = TaskFilter::build(
            None,
            Some("high"),
            Some("2024-01-01,2024-01-31"),
            &admin,
        )
        .unwrap();
        assert_eq!(
            sql_for(&filter),
            "SELECT id FROM task WHERE TRUE AND priority = $1 AND due_date BETWEEN $2 AND $3"
        );
    }
}
