//! HTTP route handlers for the API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                   - Liveness
//! GET    /health/ready             - Readiness (store reachable)
//!
//! # Auth
//! POST   /auth/register            - Create an account (role user)
//! POST   /auth/login               - Log in, sets the access_token cookie
//! POST   /auth/logout              - Expire the cookie
//! GET    /auth/me                  - The caller's own user record
//!
//! # Users (admin)
//! GET    /users                    - All users
//!
//! # Tasks (admin)
//! GET    /tasks/all                - Every task
//! POST   /tasks/create             - Create a task
//! POST   /tasks/assign             - Replace a task's assignees
//! DELETE /tasks/{id}               - Delete any task
//!
//! # Tasks (admin or assignee)
//! GET    /tasks/filter             - Tasks in the caller's scope, filtered
//! GET    /tasks/{id}               - One task
//! PUT    /tasks/update/{id}        - Replace a task's fields
//! PUT    /tasks/updateStatus/{id}  - Change a task's status
//! DELETE /tasks/delete/{id}        - Delete a task
//! ```

pub mod auth;
pub mod tasks;
pub mod users;

use std::time::Duration;

use axum::{
    Router,
    extract::State,
    http::{
        HeaderValue, Method, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultOnResponse, OnResponse, TraceLayer},
};
use tracing::Span;

use crate::config::ApiConfig;
use crate::middleware::{request_id_middleware, security_headers_middleware};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

/// Create the task routes router.
pub fn task_routes() -> Router<AppState> {
    Router::new()
        .route("/all", get(tasks::list_all))
        .route("/create", post(tasks::create))
        .route("/assign", post(tasks::assign))
        .route("/filter", get(tasks::filter))
        .route("/update/{id}", put(tasks::update))
        .route("/updateStatus/{id}", put(tasks::update_status))
        .route("/delete/{id}", delete(tasks::delete))
        .route("/{id}", get(tasks::find_one).delete(tasks::admin_delete))
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/auth", auth_routes())
        .nest("/tasks", task_routes())
        .route("/users", get(users::list))
}

/// Build the complete application: routes, middleware and state.
pub fn app(state: AppState) -> Router {
    let mut router = routes().layer(middleware::from_fn(security_headers_middleware));

    if let Some(cors) = cors_layer(state.config()) {
        router = router.layer(cors);
    }

    router
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// CORS for a separately hosted frontend, when one is configured.
///
/// Credentials are allowed so the browser sends the session cookie, which
/// in turn requires a concrete origin rather than `*`.
fn cors_layer(config: &ApiConfig) -> Option<CorsLayer> {
    let origin = config.cors_origin.as_deref()?;
    let origin = match HeaderValue::from_str(origin) {
        Ok(origin) => origin,
        Err(e) => {
            tracing::warn!(origin, error = %e, "ignoring unusable TASKS_CORS_ORIGIN");
            return None;
        }
    };

    Some(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([CONTENT_TYPE, AUTHORIZATION]),
    )
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the task store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.task_store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
