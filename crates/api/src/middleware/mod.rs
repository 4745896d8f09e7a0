//! HTTP middleware stack for the API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span with method, uri, status, latency)
//! 3. Request ID (add unique ID to each request)
//! 4. CORS (only when `TASKS_CORS_ORIGIN` is set)
//! 5. Security headers
//!
//! Authentication is not a layer: handlers opt in through the
//! [`RequireAuth`] and [`RequireAdmin`] extractors.

pub mod auth;
pub mod request_id;
pub mod security_headers;

pub use auth::{ACCESS_TOKEN_COOKIE, RequireAdmin, RequireAuth, removal_cookie, session_cookie};
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
pub use security_headers::security_headers_middleware;
