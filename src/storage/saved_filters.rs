//! Saved filters, owned per user.
//!
//! Filters belonging to other users are indistinguishable from missing ones.

use super::query::IssueFilter;
use super::sqlite::{SqliteStorage, is_unique_violation, now_rfc3339};
use super::users::ensure_user;
use crate::error::{Result, TrackerError};
use crate::model::{Issue, SavedFilter};
use crate::util::parse_stored_datetime;
use crate::validation::validate_filter_name;
use rusqlite::{Connection, OptionalExtension};

fn saved_filter_from_row(row: &rusqlite::Row) -> rusqlite::Result<SavedFilter> {
    let criteria: String = row.get(3)?;
    let filter = serde_json::from_str(&criteria).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(SavedFilter {
        id: row.get(0)?,
        owner: row.get(1)?,
        name: row.get(2)?,
        filter,
        created_at: parse_stored_datetime(&row.get::<_, String>(4)?),
    })
}

fn fetch_owned(conn: &Connection, owner: &str, id: i64) -> Result<SavedFilter> {
    conn.query_row(
        "SELECT id, owner, name, criteria, created_at FROM saved_filters
         WHERE id = ? AND owner = ?",
        rusqlite::params![id, owner],
        saved_filter_from_row,
    )
    .optional()?
    .ok_or(TrackerError::SavedFilterNotFound { id })
}

impl SqliteStorage {
    /// Store `filter` under `name` for `owner`.
    ///
    /// # Errors
    ///
    /// - `Validation` for a blank or long name
    /// - `UserNotFound` if the owner is absent
    /// - `DuplicateSavedFilter` if the owner already uses the name
    pub fn save_filter(
        &mut self,
        owner: &str,
        name: &str,
        filter: &IssueFilter,
    ) -> Result<SavedFilter> {
        validate_filter_name(name).map_err(TrackerError::from_validation_errors)?;
        let name = name.trim().to_string();
        let criteria = serde_json::to_string(filter)?;

        let saved = self.mutate("save_filter", owner, |tx, _ctx| {
            ensure_user(tx, owner)?;
            tx.execute(
                "INSERT INTO saved_filters (owner, name, criteria, created_at) VALUES (?, ?, ?, ?)",
                rusqlite::params![owner, name, criteria, now_rfc3339()],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    TrackerError::DuplicateSavedFilter { name: name.clone() }
                } else {
                    e.into()
                }
            })?;
            fetch_owned(tx, owner, tx.last_insert_rowid())
        })?;

        tracing::info!(owner = %owner, filter_id = saved.id, name = %saved.name, "Saved filter");
        Ok(saved)
    }

    /// The owner's saved filters, by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_saved_filters(&self, owner: &str) -> Result<Vec<SavedFilter>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, owner, name, criteria, created_at FROM saved_filters
             WHERE owner = ? ORDER BY name",
        )?;
        let filters = stmt
            .query_map([owner], saved_filter_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(filters)
    }

    /// # Errors
    ///
    /// `SavedFilterNotFound` if absent or owned by someone else.
    pub fn get_saved_filter(&self, owner: &str, id: i64) -> Result<SavedFilter> {
        fetch_owned(&self.conn, owner, id)
    }

    /// # Errors
    ///
    /// `SavedFilterNotFound` if absent or owned by someone else.
    pub fn delete_saved_filter(&mut self, owner: &str, id: i64) -> Result<()> {
        self.mutate("delete_saved_filter", owner, |tx, _ctx| {
            let deleted = tx.execute(
                "DELETE FROM saved_filters WHERE id = ? AND owner = ?",
                rusqlite::params![id, owner],
            )?;
            if deleted == 0 {
                return Err(TrackerError::SavedFilterNotFound { id });
            }
            Ok(())
        })
    }

    /// Run a saved filter.
    ///
    /// # Errors
    ///
    /// `SavedFilterNotFound` if absent or owned by someone else.
    pub fn apply_saved_filter(&self, owner: &str, id: i64) -> Result<Vec<Issue>> {
        let saved = self.get_saved_filter(owner, id)?;
        self.list_filtered(&saved.filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> SqliteStorage {
        let mut s = SqliteStorage::open_memory().unwrap();
        s.register_user("alice", "pw1234").unwrap();
        s.register_user("bob1", "pw1234").unwrap();
        s
    }

    fn open_bugs() -> IssueFilter {
        IssueFilter {
            is_closed: Some(false),
            labels: vec!["bug".to_string()],
            ..IssueFilter::default()
        }
    }

    #[test]
    fn save_list_get_delete() {
        let mut s = setup();
        let saved = s.save_filter("alice", "open bugs", &open_bugs()).unwrap();
        assert_eq!(saved.filter, open_bugs());

        let listed = s.list_saved_filters("alice").unwrap();
        assert_eq!(listed.len(), 1);
        assert!(s.list_saved_filters("bob1").unwrap().is_empty());

        assert_eq!(s.get_saved_filter("alice", saved.id).unwrap().name, "open bugs");
        s.delete_saved_filter("alice", saved.id).unwrap();
        assert!(matches!(
            s.get_saved_filter("alice", saved.id),
            Err(TrackerError::SavedFilterNotFound { .. })
        ));
    }

    #[test]
    fn names_unique_per_owner() {
        let mut s = setup();
        s.save_filter("alice", "mine", &open_bugs()).unwrap();
        assert!(matches!(
            s.save_filter("alice", "mine", &IssueFilter::default()),
            Err(TrackerError::DuplicateSavedFilter { .. })
        ));
        // A different owner may reuse the name.
        s.save_filter("bob1", "mine", &open_bugs()).unwrap();
    }

    #[test]
    fn other_users_filters_are_hidden() {
        let mut s = setup();
        let saved = s.save_filter("alice", "mine", &open_bugs()).unwrap();
        assert!(matches!(
            s.get_saved_filter("bob1", saved.id),
            Err(TrackerError::SavedFilterNotFound { .. })
        ));
        assert!(matches!(
            s.delete_saved_filter("bob1", saved.id),
            Err(TrackerError::SavedFilterNotFound { .. })
        ));
        assert!(s.apply_saved_filter("bob1", saved.id).is_err());
        assert!(s.apply_saved_filter("alice", saved.id).unwrap().is_empty());
    }
}
