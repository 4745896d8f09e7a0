//! Authentication extractors and the session cookie.
//!
//! The session token travels in the HTTP-only `access_token` cookie. Clients
//! that cannot keep cookies may send `Authorization: Bearer <token>` instead;
//! the cookie wins when both are present.

use axum::{
    extract::FromRequestParts,
    http::{
        HeaderMap,
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
    },
};
use cookie::{Cookie, SameSite, time::Duration};
use tracing::Span;

use taskmaster_core::{Caller, Role, require_role};

use crate::config::Environment;
use crate::error::{AppError, set_sentry_user};
use crate::services::{AuthError, Claims};
use crate::state::AppState;

/// Name of the session cookie.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Extractor that requires a valid session token.
///
/// Rejects with 401 when the token is missing, malformed or expired.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(claims): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", claims.email)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireAuth(pub Claims);

impl RequireAuth {
    #[must_use]
    pub const fn caller(&self) -> Caller {
        self.0.caller()
    }
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers).ok_or(AuthError::MissingToken)?;
        let claims = state.auth().verify_token(&token)?;

        Span::current().record("user_id", claims.sub.as_i32());
        set_sentry_user(&claims.sub, Some(claims.email.as_str()));

        Ok(Self(claims))
    }
}

/// Extractor that requires an authenticated admin.
///
/// Rejects with 401 without a valid session and 403 for non-admins, before
/// the handler runs.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub Claims);

impl RequireAdmin {
    #[must_use]
    pub const fn caller(&self) -> Caller {
        self.0.caller()
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(claims) = RequireAuth::from_request_parts(parts, state).await?;

        require_role(&claims.caller(), Role::Admin).map_err(|e| {
            tracing::warn!(user_id = %claims.sub, "admin route refused");
            AppError::Forbidden(e.to_string())
        })?;

        Ok(Self(claims))
    }
}

/// Find the session token in the request headers.
fn session_token(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == ACCESS_TOKEN_COOKIE)
        .map(|c| c.value().to_owned())
        .filter(|v| !v.is_empty());

    from_cookie.or_else(|| {
        headers
            .get(AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_owned)
    })
}

/// The `access_token` cookie carrying a freshly issued token.
///
/// Production cookies are `Secure` with `SameSite=None` so a separately
/// hosted frontend can send them; development uses `SameSite=Lax` over
/// plain HTTP.
#[must_use]
pub fn session_cookie(token: String, max_age_secs: i64, environment: Environment) -> Cookie<'static> {
    let builder = Cookie::build((ACCESS_TOKEN_COOKIE, token))
        .http_only(true)
        .path("/")
        .max_age(Duration::seconds(max_age_secs));

    if environment.is_production() {
        builder.secure(true).same_site(SameSite::None).build()
    } else {
        builder.same_site(SameSite::Lax).build()
    }
}

/// An expired `access_token` cookie, used to log out.
#[must_use]
pub fn removal_cookie(environment: Environment) -> Cookie<'static> {
    session_cookie(String::new(), 0, environment)
}
