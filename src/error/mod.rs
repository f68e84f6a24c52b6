//! Error types and handling for `issue_tracker`.
//!
//! Every failure the core can raise is a named variant of [`TrackerError`].
//! Errors are raised at the point of detection and propagated unchanged to
//! the boundary (CLI or HTTP), which maps them through [`StructuredError`].
//!
//! # Design
//!
//! - Uses `thiserror` for derive-based error types
//! - Groups variants into an [`ErrorKind`] for status/exit-code mapping
//! - Provides recovery hints for user-facing errors

mod structured;

pub use structured::{ErrorCode, StructuredError};

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for `issue_tracker` operations.
#[derive(Error, Debug)]
pub enum TrackerError {
    // === Not Found ===
    /// No user with this id.
    #[error("User not found: {id}")]
    UserNotFound { id: String },

    /// No issue with this id.
    #[error("Issue not found: {id}")]
    IssueNotFound { id: i64 },

    /// No label with this id.
    #[error("Label not found: {id}")]
    LabelNotFound { id: i64 },

    /// No milestone with this id.
    #[error("Milestone not found: {id}")]
    MilestoneNotFound { id: i64 },

    /// No comment with this id.
    #[error("Comment not found: {id}")]
    CommentNotFound { id: i64 },

    /// No saved filter with this id visible to the caller.
    #[error("Saved filter not found: {id}")]
    SavedFilterNotFound { id: i64 },

    // === Duplicates ===
    /// A user with this id is already registered.
    #[error("User already exists: {id}")]
    DuplicateUser { id: String },

    /// A label with this name (case-insensitive) already exists.
    #[error("Label name already in use: {name}")]
    DuplicateLabel { name: String },

    /// A milestone with this title already exists.
    #[error("Milestone title already in use: {title}")]
    DuplicateMilestone { title: String },

    /// The caller already has a saved filter with this name.
    #[error("Saved filter name already in use: {name}")]
    DuplicateSavedFilter { name: String },

    // === Authentication ===
    /// Password did not match the stored hash.
    #[error("Invalid credentials")]
    InvalidCredential,

    /// No valid session accompanies the request.
    #[error("Authentication required")]
    Unauthenticated,

    /// Authenticated, but not allowed to touch this resource.
    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    // === Validation ===
    /// Field validation failed.
    #[error("Validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Multiple validation errors occurred.
    #[error("Validation errors: {errors:?}")]
    ValidationErrors { errors: Vec<ValidationError> },

    /// Page numbers are 1-indexed.
    #[error("Invalid page: {page} (pages start at 1)")]
    InvalidPage { page: i64 },

    // === Counters ===
    /// A relative counter update would break `0 <= closed <= total`.
    #[error("Milestone {milestone_id} counter invariant violated adjusting {counter}")]
    CounterInvariant { milestone_id: i64, counter: String },

    // === Storage ===
    /// `SQLite` database error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    // === Configuration ===
    /// Configuration file error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Workspace not initialized.
    #[error("Issue tracker not initialized: run 'issues init' first")]
    NotInitialized,

    /// Already initialized.
    #[error("Already initialized at '{path}'")]
    AlreadyInitialized { path: PathBuf },

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Anything else (runtime plumbing, join errors).
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Coarse classification used by the CLI and HTTP boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Duplicate,
    InvalidCredential,
    Unauthenticated,
    Forbidden,
    Internal,
}

/// A single field validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// The reason for the validation failure.
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

impl TrackerError {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UserNotFound { .. }
            | Self::IssueNotFound { .. }
            | Self::LabelNotFound { .. }
            | Self::MilestoneNotFound { .. }
            | Self::CommentNotFound { .. }
            | Self::SavedFilterNotFound { .. } => ErrorKind::NotFound,
            Self::DuplicateUser { .. }
            | Self::DuplicateLabel { .. }
            | Self::DuplicateMilestone { .. }
            | Self::DuplicateSavedFilter { .. } => ErrorKind::Duplicate,
            Self::Validation { .. } | Self::ValidationErrors { .. } | Self::InvalidPage { .. } => {
                ErrorKind::Validation
            }
            Self::InvalidCredential => ErrorKind::InvalidCredential,
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            _ => ErrorKind::Internal,
        }
    }

    /// Can the user fix this without code changes?
    #[must_use]
    pub const fn is_user_recoverable(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Internal)
            || matches!(self, Self::NotInitialized | Self::AlreadyInitialized { .. })
    }

    /// Human-friendly suggestion for fixing this error.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run: issues init"),
            Self::AlreadyInitialized { .. } => Some("Use --force to reinitialize"),
            Self::InvalidPage { .. } => Some("Use --page 1 or greater"),
            Self::Unauthenticated => Some("Log in first: issues user login <id>"),
            Self::DuplicateLabel { .. } => {
                Some("Label names are case-insensitive; pick a different name")
            }
            Self::UserNotFound { .. } => Some("Register the user first: issues user register"),
            _ => None,
        }
    }

    /// Create a validation error for a specific field.
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create from multiple validation errors.
    #[must_use]
    pub fn from_validation_errors(errors: Vec<ValidationError>) -> Self {
        if errors.len() == 1 {
            let err = &errors[0];
            Self::Validation {
                field: err.field.clone(),
                reason: err.message.clone(),
            }
        } else {
            Self::ValidationErrors { errors }
        }
    }
}

/// Result type using `TrackerError`.
pub type Result<T> = std::result::Result<T, TrackerError>;
