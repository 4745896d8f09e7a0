//! End-to-end test harness for the Task Master API.
//!
//! [`TestContext`] builds the real router (all middleware included) over an
//! in-memory store and drives it with `tower::ServiceExt::oneshot`, so the
//! tests need neither a database nor a listening socket.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p taskmaster-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

use taskmaster_api::config::{ApiConfig, Environment, TokenConfig};
use taskmaster_api::db::{MemoryStore, TaskStore, UserStore};
use taskmaster_api::models::User;
use taskmaster_api::services::auth::prepare_user;
use taskmaster_api::{AppState, app};
use taskmaster_core::{Role, Task, TaskFields, UserId};

/// Signing secret used by every test server.
pub const TEST_SECRET: &str = "k7#Qz!9vR2@mL5$wX8^pN3&jT6*bF1%hY4";

/// Configuration for a test server.
#[must_use]
pub fn test_config(environment: Environment) -> ApiConfig {
    ApiConfig {
        database_url: SecretString::from("postgres://unused".to_owned()),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        token: TokenConfig {
            secret: SecretString::from(TEST_SECRET.to_owned()),
            ttl: Duration::from_secs(3600),
        },
        environment,
        cors_origin: None,
        log_json: false,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// A response reduced to what tests look at.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Parsed JSON, or the raw text as a JSON string when not JSON.
    pub body: Value,
}

impl TestResponse {
    /// The `name=value` part of the session cookie set by this response.
    #[must_use]
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("access_token="))
            .and_then(|v| v.split(';').next())
            .map(str::to_owned)
    }

    /// The full `Set-Cookie` value for the session cookie.
    #[must_use]
    pub fn set_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("access_token="))
            .map(str::to_owned)
    }
}

/// A router over a fresh in-memory store.
pub struct TestContext {
    router: Router,
    store: Arc<MemoryStore>,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(test_config(Environment::Development))
    }

    #[must_use]
    pub fn with_config(config: ApiConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::with_stores(config, store.clone(), store.clone());
        Self {
            router: app(state),
            store,
        }
    }

    /// A router whose task routes run against `tasks` instead of the
    /// in-memory store.
    #[must_use]
    pub fn with_task_store(tasks: Arc<dyn TaskStore>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::with_stores(
            test_config(Environment::Development),
            store.clone(),
            tasks,
        );
        Self {
            router: app(state),
            store,
        }
    }

    /// Insert a user directly, bypassing registration (which cannot make admins).
    pub async fn create_user(&self, username: &str, email: &str, password: &str, role: Role) -> User {
        let new_user = prepare_user(username, email, password, role).unwrap();
        UserStore::insert(self.store.as_ref(), new_user).await.unwrap()
    }

    /// Insert a task directly.
    pub async fn create_task(&self, fields: TaskFields, assigned_to: &[UserId]) -> Task {
        TaskStore::insert(
            self.store.as_ref(),
            fields,
            assigned_to.iter().copied().collect(),
        )
        .await
        .unwrap()
    }

    /// Send a request through the full middleware stack.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        self.send(Method::GET, uri, cookie, None).await
    }

    pub async fn post(&self, uri: &str, cookie: Option<&str>, body: Value) -> TestResponse {
        self.send(Method::POST, uri, cookie, Some(body)).await
    }

    pub async fn put(&self, uri: &str, cookie: Option<&str>, body: Value) -> TestResponse {
        self.send(Method::PUT, uri, cookie, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        self.send(Method::DELETE, uri, cookie, None).await
    }

    /// Log in and return the session cookie pair.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .post(
                "/auth/login",
                None,
                serde_json::json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {:?}", response.body);
        response.session_cookie().unwrap()
    }
}

/// Ids of the tasks in a JSON array response.
#[must_use]
pub fn task_ids(body: &Value) -> Vec<i64> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_i64().unwrap())
        .collect()
}
