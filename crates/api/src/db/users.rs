//! User repository backed by `PostgreSQL`.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use sqlx::PgPool;
use tracing::instrument;

use taskmaster_core::{Email, Role, UserId};

use super::{RepositoryError, UserStore, conflict_on_unique};
use crate::models::{NewUser, User};

const USER_COLUMNS: &str = "id, username, email, role, created_at, updated_at";

/// Database row for `app_user`.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: UserId,
    username: String,
    email: String,
    role: Role,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            username: row.username,
            email,
            role: row.role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

/// `PostgreSQL` implementation of [`UserStore`].
#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Create a new user store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl UserStore for PgUserStore {
    #[instrument(skip(self, user), fields(email = %user.email))]
    fn insert(&self, user: NewUser) -> BoxFuture<'_, Result<User, RepositoryError>> {
        Box::pin(async move {
            let row = sqlx::query_as::<_, UserRow>(&format!(
                r"
                INSERT INTO app_user (username, email, password_hash, role)
                VALUES ($1, $2, $3, $4)
                RETURNING {USER_COLUMNS}
                "
            ))
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "email"))?;

            User::try_from(row)
        })
    }

    fn get_by_id(&self, id: UserId) -> BoxFuture<'_, Result<Option<User>, RepositoryError>> {
        Box::pin(async move {
            sqlx::query_as::<_, UserRow>(&format!(
                "SELECT {USER_COLUMNS} FROM app_user WHERE id = $1"
            ))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
        })
    }

    fn get_by_email<'a>(
        &'a self,
        email: &'a Email,
    ) -> BoxFuture<'a, Result<Option<User>, RepositoryError>> {
        Box::pin(async move {
            sqlx::query_as::<_, UserRow>(&format!(
                "SELECT {USER_COLUMNS} FROM app_user WHERE email = $1"
            ))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
        })
    }

    fn get_credentials<'a>(
        &'a self,
        email: &'a Email,
    ) -> BoxFuture<'a, Result<Option<(User, String)>, RepositoryError>> {
        Box::pin(async move {
            let row = sqlx::query_as::<_, CredentialRow>(&format!(
                "SELECT {USER_COLUMNS}, password_hash FROM app_user WHERE email = $1"
            ))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

            let Some(row) = row else {
                return Ok(None);
            };
            Ok(Some((User::try_from(row.user)?, row.password_hash)))
        })
    }

    fn list(&self) -> BoxFuture<'_, Result<Vec<User>, RepositoryError>> {
        Box::pin(async move {
            sqlx::query_as::<_, UserRow>(&format!(
                "SELECT {USER_COLUMNS} FROM app_user ORDER BY id"
            ))
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect()
        })
    }

    #[instrument(skip(self))]
    fn set_role(
        &self,
        id: UserId,
        role: Role,
    ) -> BoxFuture<'_, Result<Option<User>, RepositoryError>> {
        Box::pin(async move {
            sqlx::query_as::<_, UserRow>(&format!(
                r"
                UPDATE app_user SET role = $2, updated_at = NOW()
                WHERE id = $1
                RETURNING {USER_COLUMNS}
                "
            ))
            .bind(id)
            .bind(role)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
        })
    }
}
