//! User directory.

use axum::{Json, extract::State};

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::User;
use crate::state::AppState;

/// `GET /users`
///
/// Lets an admin pick assignees. Password hashes are never part of [`User`].
pub async fn list(State(state): State<AppState>, _admin: RequireAdmin) -> Result<Json<Vec<User>>> {
    Ok(Json(state.auth().list_users().await?))
}
