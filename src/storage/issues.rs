//! Issue lifecycle.
//!
//! Each operation runs as one transaction: the issue row, its association
//! rows, the milestone counters it affects and its audit event commit or roll
//! back together.

use super::labels::{ensure_labels, label_names_for_issue};
use super::milestones::{CounterOp, adjust_counter, ensure_milestone, milestone_ref, milestone_title};
use super::query::{NewIssue, Page};
use super::sqlite::{
    ISSUE_COLUMNS, MutationContext, SqliteStorage, issue_from_row, now_rfc3339,
};
use super::users::{ensure_user, ensure_users};
use crate::error::{Result, TrackerError};
use crate::model::{
    EventType, Issue, IssueCounts, IssueDetail, IssuePage, PLACEHOLDER_CONTENT, StateChange,
};
use crate::validation::IssueValidator;
use rusqlite::{Connection, OptionalExtension};
use std::collections::BTreeSet;

/// The state columns an operation needs before it mutates an issue.
#[derive(Debug, Clone, Copy)]
pub(super) struct IssueState {
    pub is_closed: bool,
    pub milestone_id: Option<i64>,
}

pub(super) fn issue_state(conn: &Connection, issue_id: i64) -> Result<IssueState> {
    conn.prepare_cached("SELECT is_closed, milestone_id FROM issues WHERE id = ?")?
        .query_row([issue_id], |row| {
            Ok(IssueState {
                is_closed: row.get(0)?,
                milestone_id: row.get(1)?,
            })
        })
        .optional()?
        .ok_or(TrackerError::IssueNotFound { id: issue_id })
}

pub(super) fn ensure_issue(conn: &Connection, issue_id: i64) -> Result<()> {
    issue_state(conn, issue_id).map(|_| ())
}

pub(super) fn fetch_issue(conn: &Connection, issue_id: i64) -> Result<Issue> {
    conn.query_row(
        &format!("SELECT {ISSUE_COLUMNS} FROM issues i WHERE i.id = ?"),
        [issue_id],
        issue_from_row,
    )
    .optional()?
    .ok_or(TrackerError::IssueNotFound { id: issue_id })
}

fn assignees_for_issue(conn: &Connection, issue_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare_cached(
        "SELECT user_id FROM issue_assignees WHERE issue_id = ? ORDER BY user_id",
    )?;
    let ids = stmt
        .query_map([issue_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(ids)
}

fn dedup_ids<T: Ord + Clone>(ids: &[T]) -> Vec<T> {
    ids.iter().cloned().collect::<BTreeSet<_>>().into_iter().collect()
}

fn joined(values: &[String]) -> Option<String> {
    if values.is_empty() {
        None
    } else {
        Some(values.join(", "))
    }
}

/// Flip one issue's state inside the caller's transaction.
///
/// Already in the requested state: nothing changes and `false` is returned.
fn set_state(
    conn: &Connection,
    ctx: &mut MutationContext,
    issue_id: i64,
    close: bool,
) -> Result<bool> {
    let state = issue_state(conn, issue_id)?;
    if state.is_closed == close {
        return Ok(false);
    }

    let closed_at = close.then(now_rfc3339);
    conn.prepare_cached("UPDATE issues SET is_closed = ?, closed_at = ? WHERE id = ?")?
        .execute(rusqlite::params![close, closed_at, issue_id])?;

    if let Some(milestone_id) = state.milestone_id {
        let op = if close {
            CounterOp::IncrementClosed
        } else {
            CounterOp::DecrementClosed
        };
        adjust_counter(conn, milestone_id, op)?;
    }

    let event = if close {
        EventType::Closed
    } else {
        EventType::Reopened
    };
    ctx.record_event(event, issue_id);
    Ok(true)
}

impl SqliteStorage {
    /// Create an issue with its first comment, labels and assignees.
    ///
    /// Every reference is checked before anything is written; the first bad
    /// reference aborts the whole unit.
    ///
    /// # Errors
    ///
    /// - `Validation` for an empty or long title
    /// - `UserNotFound` for the author or the first unknown assignee
    /// - `LabelNotFound` naming the first unknown label
    /// - `MilestoneNotFound` for an unknown milestone
    pub fn create_issue(&mut self, new: &NewIssue, author: &str) -> Result<i64> {
        IssueValidator::validate(new).map_err(TrackerError::from_validation_errors)?;

        let title = new.title.trim().to_string();
        let content = new
            .content
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(PLACEHOLDER_CONTENT)
            .to_string();

        let issue_id = self.mutate("create_issue", author, |tx, ctx| {
            ensure_user(tx, author)?;
            ensure_labels(tx, &new.label_ids)?;
            ensure_users(tx, &new.assignee_ids)?;
            if let Some(milestone_id) = new.milestone_id {
                ensure_milestone(tx, milestone_id)?;
            }

            let published_at = now_rfc3339();
            tx.execute(
                "INSERT INTO issues (title, author, published_at, is_closed, milestone_id)
                 VALUES (?, ?, ?, 0, ?)",
                rusqlite::params![title, author, published_at, new.milestone_id],
            )?;
            let issue_id = tx.last_insert_rowid();

            for label_id in dedup_ids(&new.label_ids) {
                tx.execute(
                    "INSERT INTO issue_labels (issue_id, label_id) VALUES (?, ?)",
                    rusqlite::params![issue_id, label_id],
                )?;
            }
            for user_id in dedup_ids(&new.assignee_ids) {
                tx.execute(
                    "INSERT INTO issue_assignees (issue_id, user_id) VALUES (?, ?)",
                    rusqlite::params![issue_id, user_id],
                )?;
            }
            tx.execute(
                "INSERT INTO comments (issue_id, author, content, published_at)
                 VALUES (?, ?, ?, ?)",
                rusqlite::params![issue_id, author, content, published_at],
            )?;

            if let Some(milestone_id) = new.milestone_id {
                adjust_counter(tx, milestone_id, CounterOp::IncrementTotal)?;
            }

            ctx.record_change(EventType::Created, issue_id, None, Some(title.clone()));
            Ok(issue_id)
        })?;

        tracing::info!(issue_id, author = %author, milestone_id = ?new.milestone_id, "Created issue");
        Ok(issue_id)
    }

    /// Close an issue. Returns false if it was already closed.
    ///
    /// # Errors
    ///
    /// `IssueNotFound` if absent.
    pub fn close_issue(&mut self, issue_id: i64, actor: &str) -> Result<bool> {
        let changed = self.mutate("close_issue", actor, |tx, ctx| {
            set_state(tx, ctx, issue_id, true)
        })?;
        tracing::info!(issue_id, changed, "Closed issue");
        Ok(changed)
    }

    /// Reopen an issue. Returns false if it was already open.
    ///
    /// # Errors
    ///
    /// `IssueNotFound` if absent.
    pub fn open_issue(&mut self, issue_id: i64, actor: &str) -> Result<bool> {
        let changed = self.mutate("open_issue", actor, |tx, ctx| {
            set_state(tx, ctx, issue_id, false)
        })?;
        tracing::info!(issue_id, changed, "Reopened issue");
        Ok(changed)
    }

    /// Close several issues as one unit.
    ///
    /// # Errors
    ///
    /// `IssueNotFound` naming the first missing id; nothing is changed.
    pub fn close_issues(&mut self, issue_ids: &[i64], actor: &str) -> Result<Vec<StateChange>> {
        self.set_states(issue_ids, true, actor)
    }

    /// Reopen several issues as one unit.
    ///
    /// # Errors
    ///
    /// `IssueNotFound` naming the first missing id; nothing is changed.
    pub fn open_issues(&mut self, issue_ids: &[i64], actor: &str) -> Result<Vec<StateChange>> {
        self.set_states(issue_ids, false, actor)
    }

    fn set_states(
        &mut self,
        issue_ids: &[i64],
        close: bool,
        actor: &str,
    ) -> Result<Vec<StateChange>> {
        let op = if close { "close_issues" } else { "open_issues" };
        let results = self.mutate(op, actor, |tx, ctx| {
            issue_ids
                .iter()
                .map(|&issue_id| {
                    set_state(tx, ctx, issue_id, close)
                        .map(|changed| StateChange { issue_id, changed })
                })
                .collect::<Result<Vec<_>>>()
        })?;
        tracing::info!(
            count = results.len(),
            changed = results.iter().filter(|r| r.changed).count(),
            close,
            "Bulk state change"
        );
        Ok(results)
    }

    /// Move an issue to another milestone, or detach it with `None`.
    ///
    /// The issue's unit of `total_issues` (and of `closed_issues` when closed)
    /// moves from the old milestone to the new one. Reassigning to the current
    /// milestone is a no-op and returns false.
    ///
    /// # Errors
    ///
    /// - `IssueNotFound` if the issue is absent
    /// - `MilestoneNotFound` if the target milestone is absent
    pub fn reassign_milestone(
        &mut self,
        issue_id: i64,
        milestone_id: Option<i64>,
        actor: &str,
    ) -> Result<bool> {
        let changed = self.mutate("reassign_milestone", actor, |tx, ctx| {
            let state = issue_state(tx, issue_id)?;
            if state.milestone_id == milestone_id {
                return Ok(false);
            }
            if let Some(new_id) = milestone_id {
                ensure_milestone(tx, new_id)?;
            }

            let old_title = match state.milestone_id {
                Some(old_id) => {
                    let title = milestone_title(tx, old_id)?;
                    if state.is_closed {
                        adjust_counter(tx, old_id, CounterOp::DecrementClosed)?;
                    }
                    adjust_counter(tx, old_id, CounterOp::DecrementTotal)?;
                    Some(title)
                }
                None => None,
            };

            let new_title = match milestone_id {
                Some(new_id) => {
                    adjust_counter(tx, new_id, CounterOp::IncrementTotal)?;
                    if state.is_closed {
                        adjust_counter(tx, new_id, CounterOp::IncrementClosed)?;
                    }
                    Some(milestone_title(tx, new_id)?)
                }
                None => None,
            };

            tx.execute(
                "UPDATE issues SET milestone_id = ? WHERE id = ?",
                rusqlite::params![milestone_id, issue_id],
            )?;
            ctx.record_change(EventType::MilestoneChanged, issue_id, old_title, new_title);
            Ok(true)
        })?;

        if changed {
            tracing::info!(issue_id, milestone_id = ?milestone_id, "Reassigned milestone");
        }
        Ok(changed)
    }

    /// Replace an issue's title.
    ///
    /// # Errors
    ///
    /// - `Validation` for an empty or long title
    /// - `IssueNotFound` if absent
    pub fn update_title(&mut self, issue_id: i64, title: &str, actor: &str) -> Result<()> {
        IssueValidator::validate_title(title).map_err(TrackerError::from_validation_errors)?;
        let title = title.trim().to_string();

        self.mutate("update_title", actor, |tx, ctx| {
            let old = fetch_issue(tx, issue_id)?.title;
            if old == title {
                return Ok(());
            }
            tx.execute(
                "UPDATE issues SET title = ? WHERE id = ?",
                rusqlite::params![title, issue_id],
            )?;
            ctx.record_change(EventType::TitleChanged, issue_id, Some(old), Some(title.clone()));
            Ok(())
        })
    }

    /// Replace the issue's label set. An empty slice clears it.
    ///
    /// # Errors
    ///
    /// - `IssueNotFound` if absent
    /// - `LabelNotFound` naming the first unknown label
    pub fn set_labels(&mut self, issue_id: i64, label_ids: &[i64], actor: &str) -> Result<()> {
        self.mutate("set_labels", actor, |tx, ctx| {
            ensure_issue(tx, issue_id)?;
            ensure_labels(tx, label_ids)?;

            let before = label_names_for_issue(tx, issue_id)?;
            tx.execute("DELETE FROM issue_labels WHERE issue_id = ?", [issue_id])?;
            for label_id in dedup_ids(label_ids) {
                tx.execute(
                    "INSERT INTO issue_labels (issue_id, label_id) VALUES (?, ?)",
                    rusqlite::params![issue_id, label_id],
                )?;
            }
            let after = label_names_for_issue(tx, issue_id)?;

            if before != after {
                ctx.record_change(
                    EventType::LabelsChanged,
                    issue_id,
                    joined(&before),
                    joined(&after),
                );
            }
            Ok(())
        })
    }

    /// Replace the issue's assignee set. An empty slice clears it.
    ///
    /// # Errors
    ///
    /// - `IssueNotFound` if absent
    /// - `UserNotFound` naming the first unknown user
    pub fn set_assignees(&mut self, issue_id: i64, user_ids: &[String], actor: &str) -> Result<()> {
        self.mutate("set_assignees", actor, |tx, ctx| {
            ensure_issue(tx, issue_id)?;
            ensure_users(tx, user_ids)?;

            let before = assignees_for_issue(tx, issue_id)?;
            tx.execute("DELETE FROM issue_assignees WHERE issue_id = ?", [issue_id])?;
            for user_id in dedup_ids(user_ids) {
                tx.execute(
                    "INSERT INTO issue_assignees (issue_id, user_id) VALUES (?, ?)",
                    rusqlite::params![issue_id, user_id],
                )?;
            }
            let after = assignees_for_issue(tx, issue_id)?;

            if before != after {
                ctx.record_change(
                    EventType::AssigneesChanged,
                    issue_id,
                    joined(&before),
                    joined(&after),
                );
            }
            Ok(())
        })
    }

    /// Attach one label. Returns false if it was already attached.
    ///
    /// # Errors
    ///
    /// `IssueNotFound` or `LabelNotFound`.
    pub fn add_label_to_issue(&mut self, issue_id: i64, label_id: i64, actor: &str) -> Result<bool> {
        self.mutate("add_label", actor, |tx, ctx| {
            ensure_issue(tx, issue_id)?;
            ensure_labels(tx, &[label_id])?;
            let before = label_names_for_issue(tx, issue_id)?;
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO issue_labels (issue_id, label_id) VALUES (?, ?)",
                rusqlite::params![issue_id, label_id],
            )?;
            if inserted > 0 {
                let after = label_names_for_issue(tx, issue_id)?;
                ctx.record_change(
                    EventType::LabelsChanged,
                    issue_id,
                    joined(&before),
                    joined(&after),
                );
            }
            Ok(inserted > 0)
        })
    }

    /// Detach one label. Returns false if it was not attached.
    ///
    /// # Errors
    ///
    /// `IssueNotFound` or `LabelNotFound`.
    pub fn remove_label_from_issue(
        &mut self,
        issue_id: i64,
        label_id: i64,
        actor: &str,
    ) -> Result<bool> {
        self.mutate("remove_label", actor, |tx, ctx| {
            ensure_issue(tx, issue_id)?;
            ensure_labels(tx, &[label_id])?;
            let before = label_names_for_issue(tx, issue_id)?;
            let removed = tx.execute(
                "DELETE FROM issue_labels WHERE issue_id = ? AND label_id = ?",
                rusqlite::params![issue_id, label_id],
            )?;
            if removed > 0 {
                let after = label_names_for_issue(tx, issue_id)?;
                ctx.record_change(
                    EventType::LabelsChanged,
                    issue_id,
                    joined(&before),
                    joined(&after),
                );
            }
            Ok(removed > 0)
        })
    }

    /// # Errors
    ///
    /// `IssueNotFound` if absent.
    pub fn get_issue(&self, issue_id: i64) -> Result<Issue> {
        fetch_issue(&self.conn, issue_id)
    }

    /// Issue with comments, labels, assignees and milestone resolved.
    ///
    /// # Errors
    ///
    /// `IssueNotFound` if absent.
    pub fn get_issue_detail(&self, issue_id: i64) -> Result<IssueDetail> {
        let issue = fetch_issue(&self.conn, issue_id)?;
        let milestone = issue
            .milestone_id
            .map(|id| milestone_ref(&self.conn, id))
            .transpose()?;

        Ok(IssueDetail {
            comments: self.get_comments(issue_id)?,
            labels: self.get_issue_labels(issue_id)?,
            assignees: assignees_for_issue(&self.conn, issue_id)?,
            milestone,
            issue,
        })
    }

    /// Assignee ids of an issue, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_assignees(&self, issue_id: i64) -> Result<Vec<String>> {
        assignees_for_issue(&self.conn, issue_id)
    }

    /// One page of open issues, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_open_issues(&self, page: Page) -> Result<Vec<Issue>> {
        self.list_page(false, page)
    }

    /// One page of closed issues, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_closed_issues(&self, page: Page) -> Result<Vec<Issue>> {
        self.list_page(true, page)
    }

    /// One page of open or closed issues with the state's total count.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub fn list_issue_page(&self, closed: bool, page: Page) -> Result<IssuePage> {
        let total = if closed {
            self.count_closed()?
        } else {
            self.count_open()?
        };
        Ok(IssuePage {
            issues: self.list_page(closed, page)?,
            page: page.page,
            page_size: page.page_size,
            total,
        })
    }

    fn list_page(&self, closed: bool, page: Page) -> Result<Vec<Issue>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {ISSUE_COLUMNS} FROM issues i WHERE i.is_closed = ?
             ORDER BY i.published_at DESC, i.id DESC LIMIT ? OFFSET ?"
        ))?;
        let issues = stmt
            .query_map(
                rusqlite::params![closed, page.page_size, page.offset()],
                issue_from_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(issues)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count_open(&self) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM issues WHERE is_closed = 0",
            [],
            |row| row.get(0),
        )?)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count_closed(&self) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM issues WHERE is_closed = 1",
            [],
            |row| row.get(0),
        )?)
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn issue_counts(&self) -> Result<IssueCounts> {
        Ok(IssueCounts {
            open: self.count_open()?,
            closed: self.count_closed()?,
        })
    }
}
