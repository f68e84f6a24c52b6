//! Structured error output.
//!
//! Provides machine-parseable error information with:
//! - Error codes for categorization
//! - Hints for self-correction
//! - Retryability flags
//! - Context for debugging
//!
//! The same structure is printed by the CLI (`--json`) and returned as the
//! body of every failed HTTP response.

use crate::error::{ErrorKind, TrackerError};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Machine-readable error codes.
///
/// These codes are stable and can be used for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // === Storage Errors (exit code 2) ===
    DatabaseError,
    NotInitialized,
    AlreadyInitialized,
    CounterInvariant,

    // === Not Found (exit code 3) ===
    UserNotFound,
    IssueNotFound,
    LabelNotFound,
    MilestoneNotFound,
    CommentNotFound,
    SavedFilterNotFound,

    // === Validation (exit code 4) ===
    ValidationFailed,
    InvalidPage,

    // === Conflicts (exit code 5) ===
    DuplicateUser,
    DuplicateLabel,
    DuplicateMilestone,
    DuplicateSavedFilter,

    // === Auth (exit code 6) ===
    InvalidCredential,
    Unauthenticated,
    Forbidden,

    // === Config (exit code 7) ===
    ConfigError,

    // === I/O Errors (exit code 8) ===
    IoError,
    JsonError,
    YamlError,

    // === Internal Errors (exit code 1) ===
    InternalError,
}

impl ErrorCode {
    /// Get the string representation for JSON output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DatabaseError => "DATABASE_ERROR",
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::CounterInvariant => "COUNTER_INVARIANT",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::IssueNotFound => "ISSUE_NOT_FOUND",
            Self::LabelNotFound => "LABEL_NOT_FOUND",
            Self::MilestoneNotFound => "MILESTONE_NOT_FOUND",
            Self::CommentNotFound => "COMMENT_NOT_FOUND",
            Self::SavedFilterNotFound => "SAVED_FILTER_NOT_FOUND",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::InvalidPage => "INVALID_PAGE",
            Self::DuplicateUser => "DUPLICATE_USER",
            Self::DuplicateLabel => "DUPLICATE_LABEL",
            Self::DuplicateMilestone => "DUPLICATE_MILESTONE",
            Self::DuplicateSavedFilter => "DUPLICATE_SAVED_FILTER",
            Self::InvalidCredential => "INVALID_CREDENTIAL",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Forbidden => "FORBIDDEN",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::YamlError => "YAML_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Whether the caller might succeed by fixing the input and retrying.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ValidationFailed | Self::InvalidPage | Self::Unauthenticated
        )
    }

    /// Get the exit code for this error category.
    ///
    /// - 1: Internal/unknown errors
    /// - 2: Storage errors
    /// - 3: Not found
    /// - 4: Validation errors
    /// - 5: Duplicates
    /// - 6: Authentication / authorization
    /// - 7: Config errors
    /// - 8: I/O errors
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::DatabaseError
            | Self::NotInitialized
            | Self::AlreadyInitialized
            | Self::CounterInvariant => 2,
            Self::UserNotFound
            | Self::IssueNotFound
            | Self::LabelNotFound
            | Self::MilestoneNotFound
            | Self::CommentNotFound
            | Self::SavedFilterNotFound => 3,
            Self::ValidationFailed | Self::InvalidPage => 4,
            Self::DuplicateUser
            | Self::DuplicateLabel
            | Self::DuplicateMilestone
            | Self::DuplicateSavedFilter => 5,
            Self::InvalidCredential | Self::Unauthenticated | Self::Forbidden => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError | Self::YamlError => 8,
            Self::InternalError => 1,
        }
    }

    /// HTTP status code used by the server boundary.
    ///
    /// Not found → 404, bad input → 400, duplicate → 409, no session → 401.
    /// A wrong password is a bad request, matching the login form contract.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::UserNotFound
            | Self::IssueNotFound
            | Self::LabelNotFound
            | Self::MilestoneNotFound
            | Self::CommentNotFound
            | Self::SavedFilterNotFound => 404,
            Self::ValidationFailed | Self::InvalidPage | Self::InvalidCredential => 400,
            Self::DuplicateUser
            | Self::DuplicateLabel
            | Self::DuplicateMilestone
            | Self::DuplicateSavedFilter => 409,
            Self::Unauthenticated => 401,
            Self::Forbidden => 403,
            _ => 500,
        }
    }
}

/// Structured error for machine-parseable output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Machine-readable error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional hint for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether the operation can be retried
    pub retryable: bool,
    /// Additional context data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl StructuredError {
    /// Create a new structured error from a `TrackerError`.
    #[must_use]
    pub fn from_error(err: &TrackerError) -> Self {
        let (code, context) = Self::extract_code_and_context(err);
        let hint = Self::generate_hint(err);

        // Internal details stay in the logs, not in client-facing messages.
        let message = if matches!(err.kind(), ErrorKind::Internal) && code == ErrorCode::DatabaseError
        {
            "Database error".to_string()
        } else {
            err.to_string()
        };

        Self {
            code,
            message,
            hint,
            retryable: code.is_retryable(),
            context,
        }
    }

    /// Wrap in the `{ "error": ... }` envelope.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "error": {
                "code": self.code.as_str(),
                "message": self.message,
                "hint": self.hint,
                "retryable": self.retryable,
                "context": self.context,
            }
        })
    }

    /// Format for human-readable output.
    #[must_use]
    pub fn to_human(&self, color: bool) -> String {
        let mut output = String::new();

        if color {
            output.push_str(&format!("{} ", "Error:".red()));
        } else {
            output.push_str("Error: ");
        }

        output.push_str(&self.message);

        if let Some(hint) = &self.hint {
            output.push('\n');
            if color {
                output.push_str(&format!("{} ", "Hint:".yellow()));
            } else {
                output.push_str("Hint: ");
            }
            output.push_str(hint);
        }

        output
    }

    fn extract_code_and_context(err: &TrackerError) -> (ErrorCode, Option<Value>) {
        match err {
            TrackerError::UserNotFound { id } => {
                (ErrorCode::UserNotFound, Some(json!({"user_id": id})))
            }
            TrackerError::IssueNotFound { id } => {
                (ErrorCode::IssueNotFound, Some(json!({"issue_id": id})))
            }
            TrackerError::LabelNotFound { id } => {
                (ErrorCode::LabelNotFound, Some(json!({"label_id": id})))
            }
            TrackerError::MilestoneNotFound { id } => (
                ErrorCode::MilestoneNotFound,
                Some(json!({"milestone_id": id})),
            ),
            TrackerError::CommentNotFound { id } => {
                (ErrorCode::CommentNotFound, Some(json!({"comment_id": id})))
            }
            TrackerError::SavedFilterNotFound { id } => (
                ErrorCode::SavedFilterNotFound,
                Some(json!({"filter_id": id})),
            ),
            TrackerError::DuplicateUser { id } => {
                (ErrorCode::DuplicateUser, Some(json!({"user_id": id})))
            }
            TrackerError::DuplicateLabel { name } => {
                (ErrorCode::DuplicateLabel, Some(json!({"name": name})))
            }
            TrackerError::DuplicateMilestone { title } => {
                (ErrorCode::DuplicateMilestone, Some(json!({"title": title})))
            }
            TrackerError::DuplicateSavedFilter { name } => {
                (ErrorCode::DuplicateSavedFilter, Some(json!({"name": name})))
            }
            TrackerError::InvalidCredential => (ErrorCode::InvalidCredential, None),
            TrackerError::Unauthenticated => (ErrorCode::Unauthenticated, None),
            TrackerError::Forbidden { reason } => {
                (ErrorCode::Forbidden, Some(json!({"reason": reason})))
            }
            TrackerError::Validation { field, reason } => (
                ErrorCode::ValidationFailed,
                Some(json!({"field": field, "reason": reason})),
            ),
            TrackerError::ValidationErrors { errors } => {
                let details: Vec<Value> = errors
                    .iter()
                    .map(|e| json!({"field": e.field, "reason": e.message}))
                    .collect();
                (ErrorCode::ValidationFailed, Some(json!({"errors": details})))
            }
            TrackerError::InvalidPage { page } => {
                (ErrorCode::InvalidPage, Some(json!({"page": page})))
            }
            TrackerError::CounterInvariant {
                milestone_id,
                counter,
            } => (
                ErrorCode::CounterInvariant,
                Some(json!({"milestone_id": milestone_id, "counter": counter})),
            ),
            TrackerError::Database(_) => (ErrorCode::DatabaseError, None),
            TrackerError::Config(_) => (ErrorCode::ConfigError, None),
            TrackerError::NotInitialized => (ErrorCode::NotInitialized, None),
            TrackerError::AlreadyInitialized { path } => (
                ErrorCode::AlreadyInitialized,
                Some(json!({"path": path.display().to_string()})),
            ),
            TrackerError::Io(_) => (ErrorCode::IoError, None),
            TrackerError::Json(_) => (ErrorCode::JsonError, None),
            TrackerError::Yaml(_) => (ErrorCode::YamlError, None),
            TrackerError::Other(_) => (ErrorCode::InternalError, None),
        }
    }

    fn generate_hint(err: &TrackerError) -> Option<String> {
        if let Some(suggestion) = err.suggestion() {
            return Some(suggestion.to_string());
        }

        match err {
            TrackerError::IssueNotFound { .. } => {
                Some("Run 'issues list' to see available issues.".to_string())
            }
            TrackerError::LabelNotFound { .. } => {
                Some("Run 'issues label list' to see available labels.".to_string())
            }
            TrackerError::MilestoneNotFound { .. } => {
                Some("Run 'issues milestone list' to see available milestones.".to_string())
            }
            TrackerError::Validation { field, .. } if field.ends_with("color") => {
                Some("Colors use the #RRGGBB format, e.g. #D73A4A.".to_string())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_as_str() {
        assert_eq!(ErrorCode::IssueNotFound.as_str(), "ISSUE_NOT_FOUND");
        assert_eq!(ErrorCode::DuplicateLabel.as_str(), "DUPLICATE_LABEL");
        assert_eq!(ErrorCode::NotInitialized.as_str(), "NOT_INITIALIZED");
    }

    #[test]
    fn test_error_code_exit_codes() {
        assert_eq!(ErrorCode::NotInitialized.exit_code(), 2);
        assert_eq!(ErrorCode::IssueNotFound.exit_code(), 3);
        assert_eq!(ErrorCode::ValidationFailed.exit_code(), 4);
        assert_eq!(ErrorCode::DuplicateUser.exit_code(), 5);
        assert_eq!(ErrorCode::Unauthenticated.exit_code(), 6);
        assert_eq!(ErrorCode::ConfigError.exit_code(), 7);
        assert_eq!(ErrorCode::IoError.exit_code(), 8);
        assert_eq!(ErrorCode::InternalError.exit_code(), 1);
    }

    #[test]
    fn test_http_status_mapping() {
        let status = |err: TrackerError| StructuredError::from_error(&err).code.http_status();

        assert_eq!(status(TrackerError::IssueNotFound { id: 1 }), 404);
        assert_eq!(status(TrackerError::MilestoneNotFound { id: 1 }), 404);
        assert_eq!(status(TrackerError::validation("title", "empty")), 400);
        assert_eq!(status(TrackerError::InvalidPage { page: 0 }), 400);
        assert_eq!(status(TrackerError::DuplicateUser { id: "a".into() }), 409);
        assert_eq!(status(TrackerError::DuplicateLabel { name: "a".into() }), 409);
        assert_eq!(status(TrackerError::Unauthenticated), 401);
        assert_eq!(status(TrackerError::InvalidCredential), 400);
        assert_eq!(
            status(TrackerError::Forbidden {
                reason: "x".into()
            }),
            403
        );
        assert_eq!(status(TrackerError::Config("x".into())), 500);
    }

    #[test]
    fn test_structured_error_to_json() {
        let err = StructuredError::from_error(&TrackerError::LabelNotFound { id: 7 });
        let json = err.to_json();
        assert_eq!(json["error"]["code"], "LABEL_NOT_FOUND");
        assert_eq!(json["error"]["context"]["label_id"], 7);
        assert!(!json["error"]["retryable"].as_bool().unwrap());
    }

    #[test]
    fn test_database_message_is_generic() {
        let err = TrackerError::Database(rusqlite::Error::InvalidQuery);
        let structured = StructuredError::from_error(&err);
        assert_eq!(structured.code, ErrorCode::DatabaseError);
        assert_eq!(structured.message, "Database error");
    }

    #[test]
    fn test_color_hint() {
        let err = TrackerError::validation("bg_color", "must be #RRGGBB");
        let structured = StructuredError::from_error(&err);
        assert!(structured.hint.unwrap().contains("#RRGGBB"));
    }

    #[test]
    fn test_to_human_output() {
        let structured = StructuredError::from_error(&TrackerError::NotInitialized);
        let human = structured.to_human(false);
        assert!(human.starts_with("Error: Issue tracker not initialized"));
        assert!(human.contains("Hint: Run: issues init"));
    }

    #[test]
    fn test_to_human_colored() {
        colored::control::set_override(true);
        let structured = StructuredError::from_error(&TrackerError::NotInitialized);
        let human = structured.to_human(true);
        assert!(human.contains("\x1b[31m"));
        assert!(human.contains("\x1b[33m"));
    }
}
