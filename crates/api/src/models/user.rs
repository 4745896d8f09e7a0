//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use taskmaster_core::{Caller, Email, Role, UserId};

/// A registered user.
///
/// The password hash is never part of this type, so serializing a `User`
/// cannot leak it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name chosen at registration.
    pub username: String,
    /// Login email, unique across users.
    pub email: Email,
    /// Permission level.
    pub role: Role,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    #[serde(skip_serializing)]
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// The identity this user acts as.
    #[must_use]
    pub const fn caller(&self) -> Caller {
        Caller::new(self.id, self.role)
    }
}

/// Parameters for inserting a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Email,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub role: Role,
}
