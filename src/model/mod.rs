//! Core data types for `issue_tracker`.
//!
//! This module defines the fundamental types used throughout the application:
//! - `User` - A registered account
//! - `Label` - A named, coloured tag
//! - `Milestone` - A grouping of issues with denormalized progress counters
//! - `Issue` / `IssueDetail` - The core work item and its assembled read model
//! - `Comment` - Issue comments
//! - `Event` - Audit log entries
//! - `FilterSummary` / `SavedFilter` - Filter menu aggregates and stored filters

use crate::error::TrackerError;
use crate::storage::IssueFilter;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Body of the first comment when an issue is created without a description.
pub const PLACEHOLDER_CONTENT: &str = "No description was provided by the issue author.";

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub user_id: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// An authenticated session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

/// A label that can be attached to many issues.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Label {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub text_color: String,
    pub bg_color: String,
}

/// A milestone and its issue counters.
///
/// `total_issues` and `closed_issues` are maintained by the issue lifecycle
/// operations and always satisfy `0 <= closed_issues <= total_issues`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Milestone {
    pub id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
    pub is_closed: bool,
    pub total_issues: i64,
    pub closed_issues: i64,
}

impl Milestone {
    #[must_use]
    pub const fn open_issues(&self) -> i64 {
        self.total_issues - self.closed_issues
    }

    /// Completion percentage, rounded down. Empty milestones report 0.
    #[must_use]
    pub const fn progress_percent(&self) -> i64 {
        if self.total_issues == 0 {
            0
        } else {
            self.closed_issues * 100 / self.total_issues
        }
    }
}

/// Lightweight milestone reference embedded in issue read models.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MilestoneRef {
    pub id: i64,
    pub title: String,
}

/// An issue row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Issue {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub published_at: DateTime<Utc>,
    pub is_closed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone_id: Option<i64>,
}

/// A comment on an issue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub id: i64,
    pub issue_id: i64,
    pub author: String,
    pub content: String,
    pub published_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<DateTime<Utc>>,
}

/// Issue with its comments, labels, assignees and milestone resolved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssueDetail {
    #[serde(flatten)]
    pub issue: Issue,
    pub comments: Vec<Comment>,
    pub labels: Vec<Label>,
    pub assignees: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone: Option<MilestoneRef>,
}

/// Audit event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Created,
    Closed,
    Reopened,
    TitleChanged,
    LabelsChanged,
    AssigneesChanged,
    MilestoneChanged,
    Commented,
    CommentEdited,
}

impl EventType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Closed => "closed",
            Self::Reopened => "reopened",
            Self::TitleChanged => "title_changed",
            Self::LabelsChanged => "labels_changed",
            Self::AssigneesChanged => "assignees_changed",
            Self::MilestoneChanged => "milestone_changed",
            Self::Commented => "commented",
            Self::CommentEdited => "comment_edited",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "closed" => Ok(Self::Closed),
            "reopened" => Ok(Self::Reopened),
            "title_changed" => Ok(Self::TitleChanged),
            "labels_changed" => Ok(Self::LabelsChanged),
            "assignees_changed" => Ok(Self::AssigneesChanged),
            "milestone_changed" => Ok(Self::MilestoneChanged),
            "commented" => Ok(Self::Commented),
            "comment_edited" => Ok(Self::CommentEdited),
            other => Err(TrackerError::validation(
                "event_type",
                format!("unknown event type '{other}'"),
            )),
        }
    }
}

/// An audit event on an issue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub id: i64,
    pub issue_id: i64,
    pub event_type: EventType,
    pub actor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Outcome of an open or close request on one issue.
///
/// `changed` is false when the issue was already in the requested state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateChange {
    pub issue_id: i64,
    pub changed: bool,
}

/// Open/closed issue totals.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssueCounts {
    pub open: i64,
    pub closed: i64,
}

/// One page of an open or closed listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssuePage {
    pub issues: Vec<Issue>,
    pub page: i64,
    pub page_size: i64,
    /// Issues in this state across all pages.
    pub total: i64,
}

impl IssuePage {
    /// Number of pages needed for `total` issues.
    #[must_use]
    pub const fn page_count(&self) -> i64 {
        if self.total <= 0 || self.page_size <= 0 {
            0
        } else {
            (self.total - 1) / self.page_size + 1
        }
    }
}

/// Aggregates used to populate filter menus.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterSummary {
    pub counts: IssueCounts,
    pub labels: Vec<Label>,
    pub milestones: Vec<Milestone>,
    pub authors: Vec<String>,
}

/// A named filter stored by a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SavedFilter {
    pub id: i64,
    pub owner: String,
    pub name: String,
    pub filter: IssueFilter,
    pub created_at: DateTime<Utc>,
}
