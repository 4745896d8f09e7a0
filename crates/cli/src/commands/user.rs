//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! # Create a user (role defaults to user)
//! tm-cli user create -u alice -e alice@example.com -p 'correct horse' -r admin
//!
//! # Change an existing user's role
//! tm-cli user promote -e alice@example.com -r admin
//! ```
//!
//! Registration through the API always yields the `user` role, so the first
//! admin has to be created or promoted here.

use taskmaster_api::db::{PgUserStore, RepositoryError, UserStore};
use taskmaster_api::services::{AuthError, auth::prepare_user};
use taskmaster_core::{Email, Role};

use super::{CliError, connect};

fn parse_role(role: &str) -> Result<Role, CliError> {
    role.parse()
        .map_err(|_| CliError::InvalidRole(role.to_owned()))
}

/// Create a user with the given role.
///
/// # Errors
///
/// Returns an error for an invalid role, input the API would also reject, a
/// taken email, or a database failure.
pub async fn create(
    username: &str,
    email: &str,
    password: &str,
    role: &str,
) -> Result<(), CliError> {
    let role = parse_role(role)?;
    let new_user = prepare_user(username, email, password, role)?;

    let users = PgUserStore::new(connect().await?);
    let user = users.insert(new_user).await.map_err(|e| match e {
        RepositoryError::Conflict(_) => CliError::Auth(AuthError::UserAlreadyExists),
        other => other.into(),
    })?;

    tracing::info!(
        "User created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );
    Ok(())
}

/// Change the role of the user with `email`.
///
/// # Errors
///
/// Returns an error for an invalid role or email, an unknown user, or a
/// database failure.
pub async fn promote(email: &str, role: &str) -> Result<(), CliError> {
    let role = parse_role(role)?;
    let email = Email::parse(email).map_err(AuthError::from)?;

    let users = PgUserStore::new(connect().await?);
    let user = users
        .get_by_email(&email)
        .await?
        .ok_or_else(|| CliError::UnknownUser(email.to_string()))?;

    let updated = users
        .set_role(user.id, role)
        .await?
        .ok_or_else(|| CliError::UnknownUser(email.to_string()))?;

    tracing::info!("{} is now {}", updated.email, updated.role);
    tracing::info!("Existing sessions keep the old role until the user logs in again.");
    Ok(())
}
