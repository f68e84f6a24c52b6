//! Persistence for `issue_tracker`.
//!
//! A single [`SqliteStorage`] implements the user directory, label catalog,
//! milestone tracker, issue lifecycle, filter composer, comments, audit log
//! and saved filters on top of one SQLite connection.

mod comments;
pub mod events;
mod filter;
mod issues;
mod labels;
mod milestones;
pub mod query;
mod saved_filters;
pub mod schema;
pub mod sqlite;
mod users;

pub use filter::Predicate;
pub use milestones::CounterOp;
pub use query::{IssueFilter, LabelDraft, MilestoneDraft, MilestoneState, NewIssue, Page};
pub use sqlite::{MutationContext, SqliteStorage};
