//! Core types for Task Master.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod status;
pub mod task;

pub use email::{Email, EmailError};
pub use id::*;
pub use status::*;
pub use task::{Task, TaskFields};
