//! Shared utilities for `issue_tracker`.
//!
//! - Salted password hashing and session tokens (SHA256)
//! - Date parsing for milestone deadlines and stored timestamps

pub mod password;
pub mod time;

pub use password::{generate_session_token, hash_password, verify_password};
pub use time::{format_relative, parse_date, parse_stored_datetime};
