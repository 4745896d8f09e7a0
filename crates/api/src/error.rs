//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Every error body is JSON of the form `{"message": "..."}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::auth::AuthError;
use crate::services::tasks::TaskError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Task operation failed.
    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    /// User is authenticated but lacks the rights.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Malformed request body or path.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Whether this is a server-side failure worth reporting.
    fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Auth(
                AuthError::Repository(_) | AuthError::PasswordHash | AuthError::TokenEncoding(_)
            ) | Self::Task(TaskError::Repository(_))
        )
    }

    fn status(&self) -> StatusCode {
        if self.is_server_error() {
            return StatusCode::INTERNAL_SERVER_ERROR;
        }

        match self {
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials
                | AuthError::MissingToken
                | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
                _ => StatusCode::BAD_REQUEST,
            },
            Self::Task(err) => match err {
                TaskError::NotFound(_) => StatusCode::NOT_FOUND,
                TaskError::Forbidden(_) => StatusCode::FORBIDDEN,
                _ => StatusCode::BAD_REQUEST,
            },
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// The client-facing message. Internal details are never exposed.
    fn message(&self) -> String {
        if self.is_server_error() {
            return "Internal server error".to_string();
        }

        match self {
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid credentials".to_string(),
                AuthError::UserAlreadyExists => {
                    "An account with this email already exists".to_string()
                }
                AuthError::WeakPassword(msg) | AuthError::InvalidUsername(msg) => msg.clone(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                AuthError::MissingToken => "Authentication required".to_string(),
                _ => "Invalid or expired session".to_string(),
            },
            Self::Task(err) => match err {
                TaskError::NotFound(_) => "Task not found".to_string(),
                other => other.to_string(),
            },
            Self::Forbidden(msg) | Self::BadRequest(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();
        (status, Json(json!({ "message": self.message() }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use taskmaster_core::{PolicyError, QueryError, Role, TaskId};

    use super::*;
    use crate::db::RepositoryError;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_auth_error_status_codes() {
        assert_eq!(
            get_status(AuthError::InvalidCredentials.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(get_status(AuthError::InvalidToken.into()), StatusCode::UNAUTHORIZED);
        assert_eq!(get_status(AuthError::MissingToken.into()), StatusCode::UNAUTHORIZED);
        assert_eq!(
            get_status(AuthError::UserAlreadyExists.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AuthError::WeakPassword("short".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AuthError::PasswordHash.into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_task_error_status_codes() {
        assert_eq!(
            get_status(TaskError::NotFound(TaskId::new(1)).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(TaskError::Forbidden(PolicyError::NotAssigned).into()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(
                TaskError::Forbidden(PolicyError::MissingRole {
                    required: Role::Admin
                })
                .into()
            ),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(TaskError::InvalidArgument("title".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(TaskError::Query(QueryError::InvalidStatus("bogus".into())).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(
                TaskError::Repository(RepositoryError::DataCorruption("x".into())).into()
            ),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_body_is_json_message_without_internals() {
        let response = AppError::from(TaskError::Repository(RepositoryError::DataCorruption(
            "secret detail".into(),
        )))
        .into_response();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Internal server error");

        let response =
            AppError::from(TaskError::Query(QueryError::InvalidStatus("bogus".into())))
                .into_response();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Invalid status value: bogus");
    }
}
