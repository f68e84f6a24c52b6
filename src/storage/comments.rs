//! Issue comments.

use super::issues::ensure_issue;
use super::sqlite::{SqliteStorage, now_rfc3339};
use super::users::ensure_user;
use crate::error::{Result, TrackerError};
use crate::model::{Comment, EventType};
use crate::util::parse_stored_datetime;
use crate::validation::CommentValidator;
use rusqlite::{Connection, OptionalExtension};

const COMMENT_COLUMNS: &str = "id, issue_id, author, content, published_at, edited_at";

fn comment_from_row(row: &rusqlite::Row) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        issue_id: row.get(1)?,
        author: row.get(2)?,
        content: row.get(3)?,
        published_at: parse_stored_datetime(&row.get::<_, String>(4)?),
        edited_at: row
            .get::<_, Option<String>>(5)?
            .map(|s| parse_stored_datetime(&s)),
    })
}

fn fetch_comment(conn: &Connection, comment_id: i64) -> Result<Comment> {
    conn.query_row(
        &format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?"),
        [comment_id],
        comment_from_row,
    )
    .optional()?
    .ok_or(TrackerError::CommentNotFound { id: comment_id })
}

impl SqliteStorage {
    /// Add a comment to an issue.
    ///
    /// # Errors
    ///
    /// - `Validation` for blank or oversized content
    /// - `IssueNotFound` / `UserNotFound` for bad references
    pub fn add_comment(&mut self, issue_id: i64, author: &str, content: &str) -> Result<Comment> {
        CommentValidator::validate(content).map_err(TrackerError::from_validation_errors)?;

        let comment = self.mutate("add_comment", author, |tx, ctx| {
            ensure_issue(tx, issue_id)?;
            ensure_user(tx, author)?;
            tx.execute(
                "INSERT INTO comments (issue_id, author, content, published_at) VALUES (?, ?, ?, ?)",
                rusqlite::params![issue_id, author, content, now_rfc3339()],
            )?;
            let comment_id = tx.last_insert_rowid();
            ctx.record_change(
                EventType::Commented,
                issue_id,
                None,
                Some(comment_id.to_string()),
            );
            fetch_comment(tx, comment_id)
        })?;

        tracing::info!(issue_id, comment_id = comment.id, author = %author, "Added comment");
        Ok(comment)
    }

    /// Replace a comment's content. Only its author may edit it.
    ///
    /// # Errors
    ///
    /// - `CommentNotFound` if absent
    /// - `Forbidden` if `editor` is not the author
    /// - `Validation` for blank or oversized content
    pub fn edit_comment(&mut self, comment_id: i64, editor: &str, content: &str) -> Result<Comment> {
        CommentValidator::validate(content).map_err(TrackerError::from_validation_errors)?;

        self.mutate("edit_comment", editor, |tx, ctx| {
            let existing = fetch_comment(tx, comment_id)?;
            if existing.author != editor {
                return Err(TrackerError::Forbidden {
                    reason: format!("only {} can edit comment {comment_id}", existing.author),
                });
            }
            tx.execute(
                "UPDATE comments SET content = ?, edited_at = ? WHERE id = ?",
                rusqlite::params![content, now_rfc3339(), comment_id],
            )?;
            ctx.record_change(
                EventType::CommentEdited,
                existing.issue_id,
                None,
                Some(comment_id.to_string()),
            );
            fetch_comment(tx, comment_id)
        })
    }

    /// # Errors
    ///
    /// `CommentNotFound` if absent.
    pub fn get_comment(&self, comment_id: i64) -> Result<Comment> {
        fetch_comment(&self.conn, comment_id)
    }

    /// Comments on an issue, oldest first.
    ///
    /// # Errors
    ///
    /// `IssueNotFound` if the issue is absent.
    pub fn get_comments(&self, issue_id: i64) -> Result<Vec<Comment>> {
        ensure_issue(&self.conn, issue_id)?;
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE issue_id = ?
             ORDER BY published_at ASC, id ASC"
        ))?;
        let comments = stmt
            .query_map([issue_id], comment_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(comments)
    }
}
