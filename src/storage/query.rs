//! Request and filter types accepted by the storage layer.

use crate::error::{Result, TrackerError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Input for `create_issue`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewIssue {
    pub title: String,
    /// Body of the first comment. Blank or absent uses a placeholder.
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub milestone_id: Option<i64>,
    #[serde(default)]
    pub label_ids: Vec<i64>,
    #[serde(default)]
    pub assignee_ids: Vec<String>,
}

impl NewIssue {
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    #[must_use]
    pub const fn with_milestone(mut self, milestone_id: i64) -> Self {
        self.milestone_id = Some(milestone_id);
        self
    }

    #[must_use]
    pub fn with_labels(mut self, label_ids: &[i64]) -> Self {
        self.label_ids = label_ids.to_vec();
        self
    }

    #[must_use]
    pub fn with_assignees(mut self, assignees: &[&str]) -> Self {
        self.assignee_ids = assignees.iter().map(ToString::to_string).collect();
        self
    }
}

/// Label fields for create and update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub text_color: String,
    pub bg_color: String,
}

/// Milestone metadata for create and update. Counters are never part of it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MilestoneDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
}

/// Which milestones to list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MilestoneState {
    #[default]
    Open,
    Closed,
    All,
}

/// Optional issue predicates. Every `Some` field narrows the result; an
/// empty `labels` list imposes no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_closed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl IssueFilter {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.is_closed.is_none()
            && self.assignee.is_none()
            && self.labels.is_empty()
            && self.milestone.is_none()
            && self.author.is_none()
    }
}

/// A 1-indexed page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub page: i64,
    pub page_size: i64,
}

impl Page {
    /// Validate and build a page request.
    ///
    /// # Errors
    ///
    /// - `InvalidPage` if `page < 1`
    /// - a `page_size` validation error if `page_size < 1`
    /// - a `page` validation error if the row offset does not fit in an `i64`
    pub fn new(page: i64, page_size: i64) -> Result<Self> {
        if page < 1 {
            return Err(TrackerError::InvalidPage { page });
        }
        if page_size < 1 {
            return Err(TrackerError::validation("page_size", "must be at least 1"));
        }
        if (page - 1).checked_mul(page_size).is_none() {
            return Err(TrackerError::validation(
                "page",
                format!("page {page} is out of range for page size {page_size}"),
            ));
        }
        Ok(Self { page, page_size })
    }

    /// Rows to skip: `(page - 1) * page_size`, saturating.
    #[must_use]
    pub const fn offset(&self) -> i64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }
}
