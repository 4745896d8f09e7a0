//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::db::{PgTaskStore, PgUserStore, TaskStore, UserStore};
use crate::services::{Authenticator, TaskService};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// configuration and the services built on the stores.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    auth: Authenticator,
    tasks: TaskService,
    task_store: Arc<dyn TaskStore>,
}

impl AppState {
    /// Create application state backed by `PostgreSQL`.
    #[must_use]
    pub fn new(config: ApiConfig, pool: PgPool) -> Self {
        Self::with_stores(
            config,
            Arc::new(PgUserStore::new(pool.clone())),
            Arc::new(PgTaskStore::new(pool)),
        )
    }

    /// Create application state over arbitrary stores.
    #[must_use]
    pub fn with_stores(
        config: ApiConfig,
        users: Arc<dyn UserStore>,
        task_store: Arc<dyn TaskStore>,
    ) -> Self {
        let auth = Authenticator::new(users, &config.token);
        let tasks = TaskService::new(Arc::clone(&task_store));

        Self {
            inner: Arc::new(AppStateInner {
                config,
                auth,
                tasks,
                task_store,
            }),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn auth(&self) -> &Authenticator {
        &self.inner.auth
    }

    #[must_use]
    pub fn tasks(&self) -> &TaskService {
        &self.inner.tasks
    }

    /// The task store, for readiness checks.
    #[must_use]
    pub fn task_store(&self) -> &dyn TaskStore {
        self.inner.task_store.as_ref()
    }
}
