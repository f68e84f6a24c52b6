//! Command implementations.
//!
//! Each command opens storage through [`crate::config::open_storage`], does
//! its work, and prints either text or JSON.

pub mod close;
pub mod comments;
pub mod completions;
pub mod create;
pub mod filter;
pub mod history;
pub mod init;
pub mod label;
pub mod list;
pub mod milestone;
pub mod serve;
pub mod show;
pub mod update;
pub mod user;
pub mod version;

use crate::config::Config;
use crate::error::{Result, TrackerError};
use crate::model::{Label, Milestone};
use crate::storage::SqliteStorage;
use serde::Serialize;
use std::fs;
use std::io::{self, IsTerminal};
use std::path::PathBuf;

/// File inside the workspace directory holding the CLI session token.
pub const SESSION_FILENAME: &str = "session";

/// Print a value as pretty JSON on stdout.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Whether text output should carry ANSI color.
///
/// Also pins `colored`'s global switch so its own terminal detection agrees.
#[must_use]
pub fn use_color(no_color: bool) -> bool {
    let enabled =
        !no_color && std::env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal();
    colored::control::set_override(enabled);
    enabled
}

pub(crate) fn session_path(config: &Config) -> Option<PathBuf> {
    config
        .tracker_dir
        .as_ref()
        .map(|dir| dir.join(SESSION_FILENAME))
}

/// The user a mutating command acts as.
///
/// An explicit actor (flag, env, config) must name a registered user;
/// otherwise the workspace session from `user login` is used.
///
/// # Errors
///
/// - `UserNotFound` if the explicit actor is not registered
/// - `Unauthenticated` if there is no actor and no live session
pub fn resolve_actor(storage: &SqliteStorage, config: &Config) -> Result<String> {
    if let Some(actor) = &config.actor {
        return storage.get_user(actor).map(|user| user.user_id);
    }

    let Some(path) = session_path(config) else {
        return Err(TrackerError::Unauthenticated);
    };
    match fs::read_to_string(&path) {
        Ok(token) => storage.resolve_session(token.trim()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(TrackerError::Unauthenticated),
        Err(e) => Err(e.into()),
    }
}

/// Resolve a label given by ID or by (case-insensitive) name.
///
/// # Errors
///
/// `LabelNotFound` (or `Validation` for an unknown name).
pub fn resolve_label(storage: &SqliteStorage, input: &str) -> Result<Label> {
    let input = input.trim();
    if let Ok(id) = input.parse::<i64>() {
        return storage.get_label(id);
    }
    storage
        .find_label_by_name(input)?
        .ok_or_else(|| TrackerError::validation("label", format!("no label named '{input}'")))
}

/// Resolve a milestone given by ID or by title.
///
/// # Errors
///
/// `MilestoneNotFound` (or `Validation` for an unknown title).
pub fn resolve_milestone(storage: &SqliteStorage, input: &str) -> Result<Milestone> {
    let input = input.trim();
    if let Ok(id) = input.parse::<i64>() {
        return storage.get_milestone(id);
    }
    storage.find_milestone_by_title(input)?.ok_or_else(|| {
        TrackerError::validation("milestone", format!("no milestone titled '{input}'"))
    })
}

/// Resolve label inputs to IDs, skipping blanks.
///
/// # Errors
///
/// Fails on the first label that cannot be resolved.
pub fn resolve_label_ids(storage: &SqliteStorage, inputs: &[String]) -> Result<Vec<i64>> {
    inputs
        .iter()
        .filter(|input| !input.trim().is_empty())
        .map(|input| resolve_label(storage, input).map(|label| label.id))
        .collect()
}

/// Join positional words, falling back to an explicit flag value.
pub(crate) fn joined_text(words: &[String], flag: Option<&String>) -> String {
    flag.cloned().unwrap_or_else(|| words.join(" "))
}
