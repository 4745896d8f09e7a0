//! Domain models for the API.
//!
//! Task types live in `taskmaster_core`; this module holds the account types
//! that only the server handles.

pub mod user;

pub use user::{NewUser, User};
