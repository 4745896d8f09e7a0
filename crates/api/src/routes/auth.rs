//! Authentication route handlers.
//!
//! Registration, login and logout. A successful login sets the
//! `access_token` cookie; logout expires it.

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::extract::JsonBody;
use crate::middleware::{RequireAuth, removal_cookie, session_cookie};
use crate::models::User;
use crate::state::AppState;

/// Registration request body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body returned by register and login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: &'static str,
    pub user: User,
}

/// `POST /auth/register`
pub async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let user = state
        .auth()
        .register(&body.username, &body.email, &body.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully",
            user,
        }),
    ))
}

/// `POST /auth/login`
pub async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse> {
    let auth = state.auth();
    let user = auth.login(&body.email, &body.password).await?;
    let token = auth.issue_token(&user)?;
    let cookie = session_cookie(token, auth.token_ttl_secs(), state.config().environment);

    set_sentry_user(&user.id, Some(user.email.as_str()));
    tracing::info!(user_id = %user.id, "user logged in");

    Ok((
        [(SET_COOKIE, cookie.to_string())],
        Json(AuthResponse {
            message: "Logged in successfully",
            user,
        }),
    ))
}

/// `POST /auth/logout`
///
/// Always succeeds, even without a session.
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    clear_sentry_user();
    let cookie = removal_cookie(state.config().environment);

    (
        [(SET_COOKIE, cookie.to_string())],
        Json(json!({ "message": "Logged out successfully" })),
    )
}

/// `GET /auth/me`
pub async fn me(State(state): State<AppState>, auth: RequireAuth) -> Result<Json<User>> {
    let user = state.auth().current_user(&auth.0).await?;
    Ok(Json(user))
}
