//! Audit event retrieval.
//!
//! Events are written by [`SqliteStorage::mutate`] in the same transaction as
//! the change they describe. Reads return newest first.

use super::issues::ensure_issue;
use super::sqlite::SqliteStorage;
use crate::error::Result;
use crate::model::{Event, EventType};
use crate::util::parse_stored_datetime;
use rusqlite::{Connection, params};

/// Get events for an issue, newest first. `limit` 0 means no limit.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_events(conn: &Connection, issue_id: i64, limit: usize) -> Result<Vec<Event>> {
    let limit = if limit == 0 {
        -1
    } else {
        i64::try_from(limit).unwrap_or(i64::MAX)
    };

    let mut stmt = conn.prepare_cached(
        r"
        SELECT id, issue_id, event_type, actor, old_value, new_value, created_at
        FROM events
        WHERE issue_id = ?1
        ORDER BY id DESC
        LIMIT ?2
        ",
    )?;
    let events = stmt
        .query_map(params![issue_id, limit], event_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(events)
}

fn event_from_row(row: &rusqlite::Row) -> rusqlite::Result<Event> {
    let event_type_str: String = row.get(2)?;
    let event_type = event_type_str.parse::<EventType>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Event {
        id: row.get(0)?,
        issue_id: row.get(1)?,
        event_type,
        actor: row.get(3)?,
        old_value: row.get(4)?,
        new_value: row.get(5)?,
        created_at: parse_stored_datetime(&row.get::<_, String>(6)?),
    })
}

impl SqliteStorage {
    /// Full history of an issue, newest first.
    ///
    /// # Errors
    ///
    /// `IssueNotFound` if the issue is absent.
    pub fn get_events(&self, issue_id: i64) -> Result<Vec<Event>> {
        self.get_events_limited(issue_id, 0)
    }

    /// The `limit` most recent events of an issue (0 = all).
    ///
    /// # Errors
    ///
    /// `IssueNotFound` if the issue is absent.
    pub fn get_events_limited(&self, issue_id: i64, limit: usize) -> Result<Vec<Event>> {
        ensure_issue(&self.conn, issue_id)?;
        get_events(&self.conn, issue_id, limit)
    }
}
