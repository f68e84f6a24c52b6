//! `SQLite` storage implementation.
//!
//! [`SqliteStorage`] owns one connection. Every write goes through
//! [`SqliteStorage::mutate`], which opens an IMMEDIATE transaction, runs the
//! operation, appends the audit events the operation recorded and commits.
//! Any error rolls the whole unit back, so multi-step changes (an issue state
//! flip plus its milestone counter) are never half applied.
//!
//! The domain operations live in sibling modules (`users`, `labels`,
//! `milestones`, `issues`, `comments`, `filter`, `saved_filters`, `events`)
//! as further `impl SqliteStorage` blocks.

use crate::error::Result;
use crate::model::{EventType, Issue};
use crate::util::parse_stored_datetime;
use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, ErrorCode, OpenFlags, Transaction, TransactionBehavior};
use std::path::Path;
use std::time::Duration;

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    pub(super) conn: Connection,
}

/// An audit event waiting to be written at commit time.
#[derive(Debug, Clone)]
pub struct PendingEvent {
    pub issue_id: i64,
    pub event_type: EventType,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

/// Context for a mutation operation, tracking side effects.
pub struct MutationContext {
    pub op_name: String,
    pub actor: String,
    pub events: Vec<PendingEvent>,
}

impl MutationContext {
    #[must_use]
    pub fn new(op_name: &str, actor: &str) -> Self {
        Self {
            op_name: op_name.to_string(),
            actor: actor.to_string(),
            events: Vec::new(),
        }
    }

    pub fn record_event(&mut self, event_type: EventType, issue_id: i64) {
        self.record_change(event_type, issue_id, None, None);
    }

    /// Record an event with old and new values.
    pub fn record_change(
        &mut self,
        event_type: EventType,
        issue_id: i64,
        old_value: Option<String>,
        new_value: Option<String>,
    ) {
        self.events.push(PendingEvent {
            issue_id,
            event_type,
            old_value,
            new_value,
        });
    }
}

impl SqliteStorage {
    /// Open a new connection to the database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema application fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a new connection with an optional busy timeout (ms).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema application fails.
    pub fn open_with_timeout(path: &Path, lock_timeout_ms: Option<u64>) -> Result<Self> {
        let conn = Connection::open(path)?;
        if let Some(timeout) = lock_timeout_ms {
            conn.busy_timeout(Duration::from_millis(timeout))?;
        }
        super::schema::apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open a connection to a database that already has its schema.
    ///
    /// Only per-connection pragmas are applied. The file is never created.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or cannot be opened.
    pub fn open_existing(path: &Path, lock_timeout_ms: Option<u64>) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags)?;
        if let Some(timeout) = lock_timeout_ms {
            conn.busy_timeout(Duration::from_millis(timeout))?;
        }
        super::schema::apply_connection_pragmas(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        super::schema::apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Run `f` inside one IMMEDIATE transaction and write the events it records.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by `f` or by the event writes.
    /// The transaction is rolled back on error.
    pub fn mutate<F, R>(&mut self, op: &str, actor: &str, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction, &mut MutationContext) -> Result<R>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut ctx = MutationContext::new(op, actor);

        let result = f(&tx, &mut ctx)?;

        let created_at = now_rfc3339();
        for event in &ctx.events {
            tx.execute(
                "INSERT INTO events (issue_id, event_type, actor, old_value, new_value, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
                rusqlite::params![
                    event.issue_id,
                    event.event_type.as_str(),
                    ctx.actor,
                    event.old_value,
                    event.new_value,
                    created_at,
                ],
            )?;
        }

        tx.commit()?;
        tracing::debug!(op = %ctx.op_name, events = ctx.events.len(), "Committed mutation");

        Ok(result)
    }

    /// Read a metadata value.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        use rusqlite::OptionalExtension;
        Ok(self
            .conn
            .query_row("SELECT value FROM metadata WHERE key = ?", [key], |row| {
                row.get(0)
            })
            .optional()?)
    }
}

/// Fixed-width UTC timestamp, so stored values sort chronologically as text.
pub(super) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// True when `err` is a UNIQUE or PRIMARY KEY violation.
pub(super) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
    )
}

/// True when `err` is a CHECK constraint violation.
pub(super) fn is_check_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_CHECK
    )
}

/// Issue columns in the order [`issue_from_row`] reads them.
pub(super) const ISSUE_COLUMNS: &str =
    "i.id, i.title, i.author, i.published_at, i.is_closed, i.closed_at, i.milestone_id";

pub(super) fn issue_from_row(row: &rusqlite::Row) -> rusqlite::Result<Issue> {
    Ok(Issue {
        id: row.get(0)?,
        title: row.get(1)?,
        author: row.get(2)?,
        published_at: parse_stored_datetime(&row.get::<_, String>(3)?),
        is_closed: row.get(4)?,
        closed_at: row
            .get::<_, Option<String>>(5)?
            .map(|s| parse_stored_datetime(&s)),
        milestone_id: row.get(6)?,
    })
}

/// Build `?,?,?` for an `IN (...)` list.
pub(super) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrackerError;
    use tempfile::TempDir;

    #[test]
    fn test_open_memory() {
        let storage = SqliteStorage::open_memory().unwrap();
        assert_eq!(
            storage.get_metadata("schema_version").unwrap().as_deref(),
            Some("1")
        );
    }

    #[test]
    fn test_open_file_with_timeout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("issues.db");
        SqliteStorage::open_with_timeout(&path, Some(500)).unwrap();
        assert!(path.exists());
        // Reopening an existing database keeps working.
        SqliteStorage::open(&path).unwrap();
    }

    #[test]
    fn test_open_existing_skips_creation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("issues.db");
        assert!(SqliteStorage::open_existing(&path, Some(500)).is_err());
        assert!(!path.exists());

        SqliteStorage::open(&path).unwrap();
        let storage = SqliteStorage::open_existing(&path, Some(500)).unwrap();
        let foreign_keys: i32 = storage
            .conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(foreign_keys, 1);
        assert_eq!(
            storage.get_metadata("schema_version").unwrap().as_deref(),
            Some("1")
        );
    }

    #[test]
    fn test_mutate_rolls_back_on_error() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let result: Result<()> = storage.mutate("test", "tester", |tx, _ctx| {
            tx.execute(
                "INSERT INTO metadata (key, value) VALUES ('scratch', 'x')",
                [],
            )?;
            Err(TrackerError::validation("scratch", "forced failure"))
        });
        assert!(result.is_err());
        assert_eq!(storage.get_metadata("scratch").unwrap(), None);
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?,?,?");
    }
}
