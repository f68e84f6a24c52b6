//! `issue_tracker` - an issue tracker backend on `SQLite`.
//!
//! The library exposes the storage engine ([`storage::SqliteStorage`]) that
//! owns users, labels, milestones, issues, comments, audit events and saved
//! filters, plus the `issues` CLI and the HTTP API built on top of it.

pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod model;
pub mod server;
pub mod storage;
pub mod util;
pub mod validation;

pub use error::{Result, StructuredError, TrackerError};
