//! Business logic services.
//!
//! # Services
//!
//! - [`auth`] - Registration, login and session tokens
//! - [`tasks`] - Task operations gated by the access policy

pub mod auth;
pub mod tasks;

pub use auth::{AuthError, Authenticator, Claims};
pub use tasks::{TaskError, TaskService};
