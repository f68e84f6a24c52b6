//! Label catalog.

use super::query::LabelDraft;
use super::sqlite::{SqliteStorage, is_unique_violation};
use crate::error::{Result, TrackerError};
use crate::model::Label;
use crate::validation::LabelValidator;
use rusqlite::{Connection, OptionalExtension};

const LABEL_COLUMNS: &str = "id, name, description, text_color, bg_color";

pub(super) fn label_from_row(row: &rusqlite::Row) -> rusqlite::Result<Label> {
    Ok(Label {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        text_color: row.get(3)?,
        bg_color: row.get(4)?,
    })
}

/// Fail with `LabelNotFound` naming the first id that does not exist.
pub(super) fn ensure_labels(conn: &Connection, label_ids: &[i64]) -> Result<()> {
    let mut stmt = conn.prepare_cached("SELECT 1 FROM labels WHERE id = ?")?;
    for &id in label_ids {
        if !stmt.exists([id])? {
            return Err(TrackerError::LabelNotFound { id });
        }
    }
    Ok(())
}

/// Names of the labels on an issue, alphabetical.
pub(super) fn label_names_for_issue(conn: &Connection, issue_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare_cached(
        "SELECT l.name FROM issue_labels il JOIN labels l ON l.id = il.label_id
         WHERE il.issue_id = ? ORDER BY l.name COLLATE NOCASE",
    )?;
    let names = stmt
        .query_map([issue_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(names)
}

fn fetch_label(conn: &Connection, id: i64) -> Result<Label> {
    conn.query_row(
        &format!("SELECT {LABEL_COLUMNS} FROM labels WHERE id = ?"),
        [id],
        label_from_row,
    )
    .optional()?
    .ok_or(TrackerError::LabelNotFound { id })
}

fn name_taken(conn: &Connection, name: &str, except_id: Option<i64>) -> Result<bool> {
    // `name` is declared COLLATE NOCASE, so `=` compares ignoring case.
    let mut stmt = conn.prepare_cached("SELECT id FROM labels WHERE name = ?")?;
    let existing: Option<i64> = stmt.query_row([name], |row| row.get(0)).optional()?;
    Ok(existing.is_some_and(|id| Some(id) != except_id))
}

fn map_duplicate(err: rusqlite::Error, name: &str) -> TrackerError {
    if is_unique_violation(&err) {
        TrackerError::DuplicateLabel {
            name: name.to_string(),
        }
    } else {
        err.into()
    }
}

fn normalized(draft: &LabelDraft) -> LabelDraft {
    LabelDraft {
        name: draft.name.trim().to_string(),
        description: draft
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(ToString::to_string),
        text_color: draft.text_color.to_uppercase(),
        bg_color: draft.bg_color.to_uppercase(),
    }
}

impl SqliteStorage {
    /// Create a label.
    ///
    /// # Errors
    ///
    /// - `Validation` for an empty/long name or a malformed colour
    /// - `DuplicateLabel` if a label with the same name (ignoring case) exists
    pub fn create_label(&mut self, draft: &LabelDraft, actor: &str) -> Result<Label> {
        LabelValidator::validate(draft).map_err(TrackerError::from_validation_errors)?;
        let draft = normalized(draft);

        let label = self.mutate("create_label", actor, |tx, _ctx| {
            if name_taken(tx, &draft.name, None)? {
                return Err(TrackerError::DuplicateLabel {
                    name: draft.name.clone(),
                });
            }
            tx.execute(
                "INSERT INTO labels (name, description, text_color, bg_color) VALUES (?, ?, ?, ?)",
                rusqlite::params![
                    draft.name,
                    draft.description,
                    draft.text_color,
                    draft.bg_color
                ],
            )
            .map_err(|e| map_duplicate(e, &draft.name))?;
            fetch_label(tx, tx.last_insert_rowid())
        })?;

        tracing::info!(label_id = label.id, name = %label.name, "Created label");
        Ok(label)
    }

    /// Replace a label's name, description and colours.
    ///
    /// # Errors
    ///
    /// - `LabelNotFound` if absent
    /// - `Validation` / `DuplicateLabel` as for `create_label`
    pub fn update_label(&mut self, id: i64, draft: &LabelDraft, actor: &str) -> Result<Label> {
        LabelValidator::validate(draft).map_err(TrackerError::from_validation_errors)?;
        let draft = normalized(draft);

        self.mutate("update_label", actor, |tx, _ctx| {
            fetch_label(tx, id)?;
            if name_taken(tx, &draft.name, Some(id))? {
                return Err(TrackerError::DuplicateLabel {
                    name: draft.name.clone(),
                });
            }
            tx.execute(
                "UPDATE labels SET name = ?, description = ?, text_color = ?, bg_color = ?
                 WHERE id = ?",
                rusqlite::params![
                    draft.name,
                    draft.description,
                    draft.text_color,
                    draft.bg_color,
                    id
                ],
            )
            .map_err(|e| map_duplicate(e, &draft.name))?;
            fetch_label(tx, id)
        })
    }

    /// Delete a label; its issue associations go with it.
    ///
    /// # Errors
    ///
    /// `LabelNotFound` if absent.
    pub fn delete_label(&mut self, id: i64, actor: &str) -> Result<()> {
        self.mutate("delete_label", actor, |tx, _ctx| {
            let deleted = tx.execute("DELETE FROM labels WHERE id = ?", [id])?;
            if deleted == 0 {
                return Err(TrackerError::LabelNotFound { id });
            }
            Ok(())
        })?;
        tracing::info!(label_id = id, "Deleted label");
        Ok(())
    }

    /// # Errors
    ///
    /// `LabelNotFound` if absent.
    pub fn get_label(&self, id: i64) -> Result<Label> {
        fetch_label(&self.conn, id)
    }

    /// All labels, by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_labels(&self) -> Result<Vec<Label>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {LABEL_COLUMNS} FROM labels ORDER BY name COLLATE NOCASE"
        ))?;
        let labels = stmt
            .query_map([], label_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(labels)
    }

    /// Find a label by name, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn find_label_by_name(&self, name: &str) -> Result<Option<Label>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {LABEL_COLUMNS} FROM labels WHERE name = ?"),
                [name.trim()],
                label_from_row,
            )
            .optional()?)
    }

    /// Check that every id names a label.
    ///
    /// # Errors
    ///
    /// `LabelNotFound` naming the first missing id.
    pub fn validate_label_ids(&self, label_ids: &[i64]) -> Result<()> {
        ensure_labels(&self.conn, label_ids)
    }

    /// Labels attached to an issue, by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_issue_labels(&self, issue_id: i64) -> Result<Vec<Label>> {
        let mut stmt = self.conn.prepare(
            "SELECT l.id, l.name, l.description, l.text_color, l.bg_color
             FROM issue_labels il JOIN labels l ON l.id = il.label_id
             WHERE il.issue_id = ? ORDER BY l.name COLLATE NOCASE",
        )?;
        let labels = stmt
            .query_map([issue_id], label_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(labels)
    }
}
