//! Signed session tokens (HS256 JWT).

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use taskmaster_core::{Caller, Email, Role, UserId};

use super::AuthError;
use crate::config::TokenConfig;
use crate::models::User;

/// What a session token asserts about its bearer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub email: Email,
    pub role: Role,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expires at (unix seconds).
    pub exp: i64,
}

impl Claims {
    /// Claims for `user`, valid for `ttl_secs` from now.
    #[must_use]
    pub fn for_user(user: &User, ttl_secs: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            iat: now,
            exp: now.saturating_add(ttl_secs),
        }
    }

    #[must_use]
    pub const fn caller(&self) -> Caller {
        Caller::new(self.sub, self.role)
    }
}

/// Keys and lifetime used to sign and check tokens.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_secs: i64,
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys")
            .field("keys", &"[REDACTED]")
            .field("ttl_secs", &self.ttl_secs)
            .finish()
    }
}

impl TokenKeys {
    #[must_use]
    pub fn new(config: &TokenConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl_secs: i64::try_from(config.ttl.as_secs()).unwrap_or(i64::MAX),
        }
    }

    /// Token lifetime in seconds.
    #[must_use]
    pub const fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Sign `claims`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenEncoding` if signing fails.
    pub fn encode(&self, claims: &Claims) -> Result<String, AuthError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::TokenEncoding(e.to_string()))
    }

    /// Check signature and expiry, returning the claims.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for a malformed, forged or expired
    /// token.
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "rejected session token");
                AuthError::InvalidToken
            })
    }
}
