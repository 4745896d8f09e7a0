//! Authentication service.
//!
//! Password registration and login, plus the signed session token that
//! proves a prior login.

mod error;
mod token;

pub use error::AuthError;
pub use token::{Claims, TokenKeys};

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tracing::instrument;

use taskmaster_core::{Email, Role};

use crate::config::TokenConfig;
use crate::db::{RepositoryError, UserStore};
use crate::models::{NewUser, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Maximum username length.
const MAX_USERNAME_LENGTH: usize = 64;

/// Verified against when the email is unknown, so that login costs one
/// Argon2 run either way. Same parameters as [`hash_password`] produces.
const DUMMY_PASSWORD_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Authentication service.
///
/// Handles user registration, login, and session tokens.
#[derive(Clone)]
pub struct Authenticator {
    users: Arc<dyn UserStore>,
    tokens: TokenKeys,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

impl Authenticator {
    /// Create a new authenticator.
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>, config: &TokenConfig) -> Self {
        Self {
            users,
            tokens: TokenKeys::new(config),
        }
    }

    /// Token lifetime in seconds, for the cookie's `Max-Age`.
    #[must_use]
    pub const fn token_ttl_secs(&self) -> i64 {
        self.tokens.ttl_secs()
    }

    /// Register a new user with the `User` role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::InvalidUsername` if the username is blank or too long.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let new_user = prepare_user(username, email, password, Role::User)?;

        let user = self.users.insert(new_user).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
            other => AuthError::Repository(other),
        })?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// An unknown email and a wrong password fail the same way.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email is malformed.
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email)?;

        let Some((user, password_hash)) = self.users.get_credentials(&email).await? else {
            let _ = verify_password(password, DUMMY_PASSWORD_HASH);
            return Err(AuthError::InvalidCredentials);
        };

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Issue a session token for `user`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenEncoding` if signing fails.
    pub fn issue_token(&self, user: &User) -> Result<String, AuthError> {
        self.tokens
            .encode(&Claims::for_user(user, self.tokens.ttl_secs()))
    }

    /// Verify a session token and return what it asserts.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token is malformed, expired,
    /// or not signed with this server's secret.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.tokens.decode(token)
    }

    /// Look up the user a token was issued to.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the user no longer exists.
    pub async fn current_user(&self, claims: &Claims) -> Result<User, AuthError> {
        self.users
            .get_by_id(claims.sub)
            .await?
            .ok_or(AuthError::InvalidToken)
    }

    /// All registered users.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the store fails.
    pub async fn list_users(&self) -> Result<Vec<User>, AuthError> {
        Ok(self.users.list().await?)
    }
}

/// Validate registration input and hash the password.
///
/// Shared by [`Authenticator::register`] and the CLI's user creation.
///
/// # Errors
///
/// Returns the same validation errors as [`Authenticator::register`].
pub fn prepare_user(
    username: &str,
    email: &str,
    password: &str,
    role: Role,
) -> Result<NewUser, AuthError> {
    let email = Email::parse(email)?;
    let username = validate_username(username)?;
    validate_password(password)?;

    Ok(NewUser {
        username,
        email,
        password_hash: hash_password(password)?,
        role,
    })
}

fn validate_username(username: &str) -> Result<String, AuthError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AuthError::InvalidUsername(
            "username cannot be empty".to_owned(),
        ));
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(AuthError::InvalidUsername(format!(
            "username must be at most {MAX_USERNAME_LENGTH} characters"
        )));
    }
    Ok(username.to_owned())
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use secrecy::SecretString;

    use super::*;
    use crate::db::MemoryStore;

    fn authenticator() -> Authenticator {
        Authenticator::new(
            Arc::new(MemoryStore::new()),
            &TokenConfig {
                secret: SecretString::from("k7#Qz!9vR2@mL5$wX8^pN3&jT6*bF1%hY4".to_owned()),
                ttl: Duration::from_secs(3600),
            },
        )
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("secret1").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("secret1", &hash).is_ok());
        assert!(matches!(
            verify_password("secret2", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_dummy_hash_matches_real_parameters() {
        let real = hash_password("secret1").unwrap();
        let params = |phc: &str| phc.split('$').take(4).collect::<Vec<_>>().join("$");
        assert_eq!(params(DUMMY_PASSWORD_HASH), params(&real));

        assert!(PasswordHash::new(DUMMY_PASSWORD_HASH).is_ok());
        assert!(matches!(
            verify_password("secret1", DUMMY_PASSWORD_HASH),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_prepare_user_validation() {
        assert!(matches!(
            prepare_user("alice", "not-an-email", "secret1", Role::User),
            Err(AuthError::InvalidEmail(_))
        ));
        assert!(matches!(
            prepare_user("   ", "a@x.com", "secret1", Role::User),
            Err(AuthError::InvalidUsername(_))
        ));
        assert!(matches!(
            prepare_user(&"x".repeat(65), "a@x.com", "secret1", Role::User),
            Err(AuthError::InvalidUsername(_))
        ));
        assert!(matches!(
            prepare_user("alice", "a@x.com", "12345", Role::User),
            Err(AuthError::WeakPassword(_))
        ));

        let user = prepare_user(" alice ", "A@X.com", "secret1", Role::Admin).unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.email.as_str(), "a@x.com");
        assert_eq!(user.role, Role::Admin);
        assert_ne!(user.password_hash, "secret1");
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let auth = authenticator();
        let registered = auth.register("alice", "a@x.com", "secret1").await.unwrap();
        assert_eq!(registered.role, Role::User);

        let logged_in = auth.login("a@x.com", "secret1").await.unwrap();
        assert_eq!(logged_in.id, registered.id);
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let auth = authenticator();
        auth.register("alice", "a@x.com", "secret1").await.unwrap();
        let again = auth.register("alice2", "a@x.com", "secret2").await;
        assert!(matches!(again, Err(AuthError::UserAlreadyExists)));
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let auth = authenticator();
        auth.register("alice", "a@x.com", "secret1").await.unwrap();

        assert!(matches!(
            auth.login("a@x.com", "wrong-password").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("nobody@x.com", "secret1").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("garbage", "secret1").await,
            Err(AuthError::InvalidEmail(_))
        ));
    }

    #[tokio::test]
    async fn test_token_identifies_user() {
        let auth = authenticator();
        let user = auth.register("alice", "a@x.com", "secret1").await.unwrap();

        let token = auth.issue_token(&user).unwrap();
        let claims = auth.verify_token(&token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.caller(), user.caller());
        assert_eq!(auth.current_user(&claims).await.unwrap(), user);
    }
}
