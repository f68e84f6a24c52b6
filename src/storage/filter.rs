//! Filter composer.
//!
//! An [`IssueFilter`] is turned into a list of [`Predicate`]s, each of which
//! appends one independent constraint to a single query. Zero predicates
//! yield every issue; any combination composes the same way.

use super::query::IssueFilter;
use super::sqlite::{ISSUE_COLUMNS, SqliteStorage, issue_from_row};
use crate::error::Result;
use crate::model::{FilterSummary, Issue};
use rusqlite::ToSql;

/// One optional constraint on the issue listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    State { closed: bool },
    Assignee(String),
    /// Issue carries a label with this name.
    Label(String),
    /// Issue belongs to the milestone with this title.
    Milestone(String),
    Author(String),
}

impl Predicate {
    fn apply(&self, query: &mut FilterQuery) {
        match self {
            Self::State { closed } => query.push("i.is_closed = ?", *closed),
            Self::Assignee(user_id) => query.push(
                "EXISTS (SELECT 1 FROM issue_assignees a
                         WHERE a.issue_id = i.id AND a.user_id = ?)",
                user_id.clone(),
            ),
            Self::Label(name) => query.push(
                "EXISTS (SELECT 1 FROM issue_labels il JOIN labels l ON l.id = il.label_id
                         WHERE il.issue_id = i.id AND l.name = ?)",
                name.clone(),
            ),
            Self::Milestone(title) => query.push(
                "EXISTS (SELECT 1 FROM milestones m
                         WHERE m.id = i.milestone_id AND m.title = ?)",
                title.clone(),
            ),
            Self::Author(user_id) => query.push("i.author = ?", user_id.clone()),
        }
    }
}

impl IssueFilter {
    /// The predicates this filter imposes, in a stable order.
    #[must_use]
    pub fn predicates(&self) -> Vec<Predicate> {
        let mut predicates = Vec::new();
        if let Some(closed) = self.is_closed {
            predicates.push(Predicate::State { closed });
        }
        if let Some(assignee) = &self.assignee {
            predicates.push(Predicate::Assignee(assignee.clone()));
        }
        for label in &self.labels {
            predicates.push(Predicate::Label(label.clone()));
        }
        if let Some(milestone) = &self.milestone {
            predicates.push(Predicate::Milestone(milestone.clone()));
        }
        if let Some(author) = &self.author {
            predicates.push(Predicate::Author(author.clone()));
        }
        predicates
    }
}

/// Accumulates WHERE clauses and their bound parameters.
#[derive(Default)]
struct FilterQuery {
    clauses: Vec<&'static str>,
    params: Vec<Box<dyn ToSql>>,
}

impl FilterQuery {
    fn push<T: ToSql + 'static>(&mut self, clause: &'static str, param: T) {
        self.clauses.push(clause);
        self.params.push(Box::new(param));
    }

    fn sql(&self) -> String {
        let mut sql = format!("SELECT {ISSUE_COLUMNS} FROM issues i");
        if !self.clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY i.published_at DESC, i.id DESC");
        sql
    }
}

impl SqliteStorage {
    /// Issues matching every predicate in `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_filtered(&self, filter: &IssueFilter) -> Result<Vec<Issue>> {
        let mut query = FilterQuery::default();
        for predicate in filter.predicates() {
            predicate.apply(&mut query);
        }

        let sql = query.sql();
        tracing::debug!(predicates = query.clauses.len(), sql = %sql, "Composed issue filter");

        let mut stmt = self.conn.prepare(&sql)?;
        let params: Vec<&dyn ToSql> = query.params.iter().map(AsRef::as_ref).collect();
        let issues = stmt
            .query_map(params.as_slice(), issue_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(issues)
    }

    /// Distinct issue authors, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_authors(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT author FROM issues ORDER BY author")?;
        let authors = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(authors)
    }

    /// Counts, labels, open milestones and authors for filter menus.
    /// Always read fresh.
    ///
    /// # Errors
    ///
    /// Returns an error if any query fails.
    pub fn filter_summary(&self) -> Result<FilterSummary> {
        Ok(FilterSummary {
            counts: self.issue_counts()?,
            labels: self.list_labels()?,
            milestones: self.list_open_milestones()?,
            authors: self.list_authors()?,
        })
    }
}
