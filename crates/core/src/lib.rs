//! Task Master Core - Shared types and policy library.
//!
//! This crate provides the domain types and pure decision logic used across
//! all Task Master components:
//! - `api` - REST API server
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. This keeps the access rules testable in isolation.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, roles, task statuses and the task record
//! - [`policy`] - Who may act on which task
//! - [`query`] - Caller-scoped task filters built from raw query parameters

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod policy;
pub mod query;
pub mod types;

pub use policy::{Caller, PolicyError, can_access, check_access, require_role};
pub use query::{DueDate, QueryError, TaskFilter};
pub use types::*;
