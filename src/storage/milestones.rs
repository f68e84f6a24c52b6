//! Milestone tracker.
//!
//! Counters change only through single relative `UPDATE` statements. Each
//! statement carries a guard so it can never take a row outside
//! `0 <= closed_issues <= total_issues`; the schema's CHECK constraint backs
//! the same invariant.

use super::query::{MilestoneDraft, MilestoneState};
use super::sqlite::{SqliteStorage, is_check_violation, is_unique_violation};
use crate::error::{Result, TrackerError};
use crate::model::{Milestone, MilestoneRef};
use crate::validation::MilestoneValidator;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};

const MILESTONE_COLUMNS: &str =
    "id, title, description, deadline, is_closed, total_issues, closed_issues";

/// One relative counter adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterOp {
    IncrementTotal,
    DecrementTotal,
    IncrementClosed,
    DecrementClosed,
}

impl CounterOp {
    const fn sql(self) -> &'static str {
        match self {
            Self::IncrementTotal => {
                "UPDATE milestones SET total_issues = total_issues + 1 WHERE id = ?"
            }
            Self::DecrementTotal => {
                "UPDATE milestones SET total_issues = total_issues - 1
                 WHERE id = ? AND total_issues > closed_issues"
            }
            Self::IncrementClosed => {
                "UPDATE milestones SET closed_issues = closed_issues + 1
                 WHERE id = ? AND closed_issues < total_issues"
            }
            Self::DecrementClosed => {
                "UPDATE milestones SET closed_issues = closed_issues - 1
                 WHERE id = ? AND closed_issues > 0"
            }
        }
    }

    const fn counter(self) -> &'static str {
        match self {
            Self::IncrementTotal | Self::DecrementTotal => "total_issues",
            Self::IncrementClosed | Self::DecrementClosed => "closed_issues",
        }
    }
}

/// Apply one counter adjustment inside the caller's transaction.
pub(super) fn adjust_counter(conn: &Connection, milestone_id: i64, op: CounterOp) -> Result<()> {
    let invariant = || TrackerError::CounterInvariant {
        milestone_id,
        counter: op.counter().to_string(),
    };

    let updated = conn
        .prepare_cached(op.sql())?
        .execute([milestone_id])
        .map_err(|e| {
            if is_check_violation(&e) {
                invariant()
            } else {
                e.into()
            }
        })?;

    if updated == 1 {
        tracing::trace!(milestone_id, ?op, "Adjusted milestone counter");
        return Ok(());
    }
    ensure_milestone(conn, milestone_id)?;
    Err(invariant())
}

/// Fail with `MilestoneNotFound` unless the milestone exists.
pub(super) fn ensure_milestone(conn: &Connection, milestone_id: i64) -> Result<()> {
    let exists = conn
        .prepare_cached("SELECT 1 FROM milestones WHERE id = ?")?
        .exists([milestone_id])?;
    if exists {
        Ok(())
    } else {
        Err(TrackerError::MilestoneNotFound { id: milestone_id })
    }
}

pub(super) fn milestone_title(conn: &Connection, milestone_id: i64) -> Result<String> {
    conn.query_row(
        "SELECT title FROM milestones WHERE id = ?",
        [milestone_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or(TrackerError::MilestoneNotFound { id: milestone_id })
}

pub(super) fn milestone_ref(conn: &Connection, milestone_id: i64) -> Result<MilestoneRef> {
    Ok(MilestoneRef {
        id: milestone_id,
        title: milestone_title(conn, milestone_id)?,
    })
}

fn milestone_from_row(row: &rusqlite::Row) -> rusqlite::Result<Milestone> {
    Ok(Milestone {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        deadline: row
            .get::<_, Option<String>>(3)?
            .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        is_closed: row.get(4)?,
        total_issues: row.get(5)?,
        closed_issues: row.get(6)?,
    })
}

fn fetch_milestone(conn: &Connection, id: i64) -> Result<Milestone> {
    conn.query_row(
        &format!("SELECT {MILESTONE_COLUMNS} FROM milestones WHERE id = ?"),
        [id],
        milestone_from_row,
    )
    .optional()?
    .ok_or(TrackerError::MilestoneNotFound { id })
}

fn title_taken(conn: &Connection, title: &str, except_id: Option<i64>) -> Result<bool> {
    let existing: Option<i64> = conn
        .query_row("SELECT id FROM milestones WHERE title = ?", [title], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(existing.is_some_and(|id| Some(id) != except_id))
}

fn map_duplicate(err: rusqlite::Error, title: &str) -> TrackerError {
    if is_unique_violation(&err) {
        TrackerError::DuplicateMilestone {
            title: title.to_string(),
        }
    } else {
        err.into()
    }
}

fn clean_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(ToString::to_string)
}

impl SqliteStorage {
    /// Create a milestone with zeroed counters.
    ///
    /// # Errors
    ///
    /// - `Validation` for an empty or long title
    /// - `DuplicateMilestone` if the title is taken
    pub fn create_milestone(&mut self, draft: &MilestoneDraft, actor: &str) -> Result<Milestone> {
        MilestoneValidator::validate(draft).map_err(TrackerError::from_validation_errors)?;
        let title = draft.title.trim().to_string();
        let description = clean_description(draft.description.as_deref());
        let deadline = draft.deadline.map(|d| d.format("%Y-%m-%d").to_string());

        let milestone = self.mutate("create_milestone", actor, |tx, _ctx| {
            if title_taken(tx, &title, None)? {
                return Err(TrackerError::DuplicateMilestone {
                    title: title.clone(),
                });
            }
            tx.execute(
                "INSERT INTO milestones (title, description, deadline) VALUES (?, ?, ?)",
                rusqlite::params![title, description, deadline],
            )
            .map_err(|e| map_duplicate(e, &title))?;
            fetch_milestone(tx, tx.last_insert_rowid())
        })?;

        tracing::info!(milestone_id = milestone.id, title = %milestone.title, "Created milestone");
        Ok(milestone)
    }

    /// Replace title, description and deadline. Counters are untouched.
    ///
    /// # Errors
    ///
    /// - `MilestoneNotFound` if absent
    /// - `Validation` / `DuplicateMilestone` as for `create_milestone`
    pub fn update_milestone(
        &mut self,
        id: i64,
        draft: &MilestoneDraft,
        actor: &str,
    ) -> Result<Milestone> {
        MilestoneValidator::validate(draft).map_err(TrackerError::from_validation_errors)?;
        let title = draft.title.trim().to_string();
        let description = clean_description(draft.description.as_deref());
        let deadline = draft.deadline.map(|d| d.format("%Y-%m-%d").to_string());

        self.mutate("update_milestone", actor, |tx, _ctx| {
            ensure_milestone(tx, id)?;
            if title_taken(tx, &title, Some(id))? {
                return Err(TrackerError::DuplicateMilestone {
                    title: title.clone(),
                });
            }
            tx.execute(
                "UPDATE milestones SET title = ?, description = ?, deadline = ? WHERE id = ?",
                rusqlite::params![title, description, deadline, id],
            )
            .map_err(|e| map_duplicate(e, &title))?;
            fetch_milestone(tx, id)
        })
    }

    /// Delete a milestone. Its issues remain, with the reference cleared.
    ///
    /// # Errors
    ///
    /// `MilestoneNotFound` if absent.
    pub fn delete_milestone(&mut self, id: i64, actor: &str) -> Result<()> {
        self.mutate("delete_milestone", actor, |tx, _ctx| {
            let deleted = tx.execute("DELETE FROM milestones WHERE id = ?", [id])?;
            if deleted == 0 {
                return Err(TrackerError::MilestoneNotFound { id });
            }
            Ok(())
        })?;
        tracing::info!(milestone_id = id, "Deleted milestone");
        Ok(())
    }

    /// # Errors
    ///
    /// `MilestoneNotFound` if absent.
    pub fn get_milestone(&self, id: i64) -> Result<Milestone> {
        fetch_milestone(&self.conn, id)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn find_milestone_by_title(&self, title: &str) -> Result<Option<Milestone>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {MILESTONE_COLUMNS} FROM milestones WHERE title = ?"),
                [title.trim()],
                milestone_from_row,
            )
            .optional()?)
    }

    /// Milestones in the given state, by deadline (undated last) then title.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_milestones(&self, state: MilestoneState) -> Result<Vec<Milestone>> {
        let condition = match state {
            MilestoneState::Open => "WHERE is_closed = 0",
            MilestoneState::Closed => "WHERE is_closed = 1",
            MilestoneState::All => "",
        };
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MILESTONE_COLUMNS} FROM milestones {condition}
             ORDER BY deadline IS NULL, deadline, title"
        ))?;
        let milestones = stmt
            .query_map([], milestone_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(milestones)
    }

    /// Milestones not marked closed.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_open_milestones(&self) -> Result<Vec<Milestone>> {
        self.list_milestones(MilestoneState::Open)
    }

    /// # Errors
    ///
    /// `MilestoneNotFound` if absent.
    pub fn close_milestone(&mut self, id: i64, actor: &str) -> Result<Milestone> {
        self.set_milestone_closed(id, true, actor)
    }

    /// # Errors
    ///
    /// `MilestoneNotFound` if absent.
    pub fn reopen_milestone(&mut self, id: i64, actor: &str) -> Result<Milestone> {
        self.set_milestone_closed(id, false, actor)
    }

    fn set_milestone_closed(&mut self, id: i64, closed: bool, actor: &str) -> Result<Milestone> {
        let op = if closed { "close_milestone" } else { "reopen_milestone" };
        self.mutate(op, actor, |tx, _ctx| {
            let updated = tx.execute(
                "UPDATE milestones SET is_closed = ? WHERE id = ?",
                rusqlite::params![closed, id],
            )?;
            if updated == 0 {
                return Err(TrackerError::MilestoneNotFound { id });
            }
            fetch_milestone(tx, id)
        })
    }

    /// Check that the milestone exists.
    ///
    /// # Errors
    ///
    /// `MilestoneNotFound` if absent.
    pub fn validate_milestone(&self, id: i64) -> Result<()> {
        ensure_milestone(&self.conn, id)
    }

    /// Apply a single counter adjustment in its own transaction.
    ///
    /// Issue operations adjust counters inside their own transactions; this
    /// entry point exists for callers that orchestrate counters themselves.
    ///
    /// # Errors
    ///
    /// - `MilestoneNotFound` if absent
    /// - `CounterInvariant` if the adjustment would break `0 <= closed <= total`
    pub fn adjust_milestone_counter(&mut self, id: i64, op: CounterOp) -> Result<()> {
        self.mutate("adjust_milestone_counter", "", |tx, _ctx| {
            adjust_counter(tx, id, op)
        })
    }

    /// # Errors
    ///
    /// See [`Self::adjust_milestone_counter`].
    pub fn increment_total(&mut self, id: i64) -> Result<()> {
        self.adjust_milestone_counter(id, CounterOp::IncrementTotal)
    }

    /// # Errors
    ///
    /// See [`Self::adjust_milestone_counter`].
    pub fn decrement_total(&mut self, id: i64) -> Result<()> {
        self.adjust_milestone_counter(id, CounterOp::DecrementTotal)
    }

    /// # Errors
    ///
    /// See [`Self::adjust_milestone_counter`].
    pub fn increment_closed(&mut self, id: i64) -> Result<()> {
        self.adjust_milestone_counter(id, CounterOp::IncrementClosed)
    }

    /// # Errors
    ///
    /// See [`Self::adjust_milestone_counter`].
    pub fn decrement_closed(&mut self, id: i64) -> Result<()> {
        self.adjust_milestone_counter(id, CounterOp::DecrementClosed)
    }
}
