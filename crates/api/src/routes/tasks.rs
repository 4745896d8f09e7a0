//! Task route handlers.
//!
//! Admin-only routes take [`RequireAdmin`], so a non-admin is refused before
//! the handler body runs. Per-task routes take [`RequireAuth`] and leave the
//! assignment check to [`TaskService`](crate::services::TaskService).

use std::collections::BTreeSet;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use taskmaster_core::{Task, TaskFields, TaskId, TaskStatus, UserId};

use crate::error::Result;
use crate::extract::{JsonBody, PathParam};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::state::AppState;

/// Body of `POST /tasks/create`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[serde(flatten)]
    pub fields: TaskFields,
    #[serde(default)]
    pub assigned_to: BTreeSet<UserId>,
}

/// Body of `POST /tasks/assign`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub task_id: TaskId,
    pub user_ids: BTreeSet<UserId>,
}

/// Body of `PUT /tasks/updateStatus/{id}`.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: TaskStatus,
}

/// Query of `GET /tasks/filter`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterParams {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<String>,
}

/// `GET /tasks/all`
pub async fn list_all(
    State(state): State<AppState>,
    admin: RequireAdmin,
) -> Result<Json<Vec<Task>>> {
    Ok(Json(state.tasks().list_all(&admin.caller()).await?))
}

/// `POST /tasks/create`
pub async fn create(
    State(state): State<AppState>,
    admin: RequireAdmin,
    JsonBody(body): JsonBody<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>)> {
    let task = state
        .tasks()
        .create(&admin.caller(), body.fields, body.assigned_to)
        .await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// `POST /tasks/assign`
pub async fn assign(
    State(state): State<AppState>,
    admin: RequireAdmin,
    JsonBody(body): JsonBody<AssignRequest>,
) -> Result<Json<Task>> {
    let task = state
        .tasks()
        .assign(&admin.caller(), body.task_id, body.user_ids)
        .await?;
    Ok(Json(task))
}

/// `DELETE /tasks/{id}`
pub async fn admin_delete(
    State(state): State<AppState>,
    admin: RequireAdmin,
    PathParam(id): PathParam<TaskId>,
) -> Result<Json<Task>> {
    Ok(Json(state.tasks().admin_delete(&admin.caller(), id).await?))
}

/// `GET /tasks/{id}`
pub async fn find_one(
    State(state): State<AppState>,
    auth: RequireAuth,
    PathParam(id): PathParam<TaskId>,
) -> Result<Json<Task>> {
    Ok(Json(state.tasks().find_by_id(&auth.caller(), id).await?))
}

/// `GET /tasks/filter?status=&priority=&dueDate=`
pub async fn filter(
    State(state): State<AppState>,
    auth: RequireAuth,
    Query(params): Query<FilterParams>,
) -> Result<Json<Vec<Task>>> {
    let tasks = state
        .tasks()
        .filter(
            &auth.caller(),
            params.status.as_deref(),
            params.priority.as_deref(),
            params.due_date.as_deref(),
        )
        .await?;
    Ok(Json(tasks))
}

/// `PUT /tasks/update/{id}`
pub async fn update(
    State(state): State<AppState>,
    auth: RequireAuth,
    PathParam(id): PathParam<TaskId>,
    JsonBody(fields): JsonBody<TaskFields>,
) -> Result<Json<Task>> {
    Ok(Json(state.tasks().update(&auth.caller(), id, fields).await?))
}

/// `DELETE /tasks/delete/{id}`
pub async fn delete(
    State(state): State<AppState>,
    auth: RequireAuth,
    PathParam(id): PathParam<TaskId>,
) -> Result<Json<Task>> {
    Ok(Json(state.tasks().delete(&auth.caller(), id).await?))
}

/// `PUT /tasks/updateStatus/{id}`
pub async fn update_status(
    State(state): State<AppState>,
    auth: RequireAuth,
    PathParam(id): PathParam<TaskId>,
    JsonBody(body): JsonBody<StatusRequest>,
) -> Result<Json<Task>> {
    let task = state
        .tasks()
        .change_status(&auth.caller(), id, body.status)
        .await?;
    Ok(Json(task))
}
