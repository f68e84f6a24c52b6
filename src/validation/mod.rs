//! Validation helpers for `issue_tracker`.
//!
//! These routines enforce field constraints and return structured
//! validation errors without touching storage. Reference checks (does this
//! label exist?) happen in the storage layer inside the mutating
//! transaction.

use crate::error::ValidationError;
use crate::storage::{LabelDraft, MilestoneDraft, NewIssue};
use regex::Regex;
use std::sync::LazyLock;

pub const MAX_TITLE_LEN: usize = 255;
pub const MAX_LABEL_NAME_LEN: usize = 50;
pub const MAX_COMMENT_LEN: usize = 10_000;
pub const MAX_FILTER_NAME_LEN: usize = 100;
pub const MIN_PASSWORD_LEN: usize = 4;
pub const MAX_PASSWORD_LEN: usize = 64;

static USER_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{4,20}$").expect("user id pattern compiles"));

static COLOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("color pattern compiles"));

type Outcome = Result<(), Vec<ValidationError>>;

fn finish(errors: Vec<ValidationError>) -> Outcome {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_title(errors: &mut Vec<ValidationError>, field: &str, title: &str) {
    if title.trim().is_empty() {
        errors.push(ValidationError::new(field, "cannot be empty"));
    } else if title.chars().count() > MAX_TITLE_LEN {
        errors.push(ValidationError::new(
            field,
            format!("exceeds {MAX_TITLE_LEN} characters"),
        ));
    }
}

/// Validates issue fields.
pub struct IssueValidator;

impl IssueValidator {
    /// Validate a new issue request.
    ///
    /// # Errors
    ///
    /// Returns every violated rule.
    pub fn validate(issue: &NewIssue) -> Outcome {
        let mut errors = Vec::new();
        check_title(&mut errors, "title", &issue.title);
        if let Some(content) = issue.content.as_deref() {
            if content.chars().count() > MAX_COMMENT_LEN {
                errors.push(ValidationError::new(
                    "content",
                    format!("exceeds {MAX_COMMENT_LEN} characters"),
                ));
            }
        }
        finish(errors)
    }

    /// Validate a replacement title.
    ///
    /// # Errors
    ///
    /// Returns an error if the title is empty or too long.
    pub fn validate_title(title: &str) -> Outcome {
        let mut errors = Vec::new();
        check_title(&mut errors, "title", title);
        finish(errors)
    }
}

/// Validates label name and colours.
pub struct LabelValidator;

impl LabelValidator {
    /// Validate a label draft (create or full update).
    ///
    /// # Errors
    ///
    /// Returns every violated rule.
    pub fn validate(draft: &LabelDraft) -> Outcome {
        let mut errors = Vec::new();

        let name = draft.name.trim();
        if name.is_empty() {
            errors.push(ValidationError::new("name", "cannot be empty"));
        } else if name.chars().count() > MAX_LABEL_NAME_LEN {
            errors.push(ValidationError::new(
                "name",
                format!("exceeds {MAX_LABEL_NAME_LEN} characters"),
            ));
        }

        if !is_valid_color(&draft.text_color) {
            errors.push(ValidationError::new("text_color", "must be #RRGGBB"));
        }
        if !is_valid_color(&draft.bg_color) {
            errors.push(ValidationError::new("bg_color", "must be #RRGGBB"));
        }

        finish(errors)
    }
}

/// `#RRGGBB`, hex digits in either case.
#[must_use]
pub fn is_valid_color(color: &str) -> bool {
    COLOR_RE.is_match(color)
}

/// Validates milestone metadata.
pub struct MilestoneValidator;

impl MilestoneValidator {
    /// # Errors
    ///
    /// Returns an error if the title is empty or too long.
    pub fn validate(draft: &MilestoneDraft) -> Outcome {
        let mut errors = Vec::new();
        check_title(&mut errors, "title", &draft.title);
        finish(errors)
    }
}

/// Validates registration input.
pub struct UserValidator;

impl UserValidator {
    /// Validate a user id and raw password.
    ///
    /// # Errors
    ///
    /// Returns every violated rule.
    pub fn validate(user_id: &str, password: &str) -> Outcome {
        let mut errors = Vec::new();
        if !USER_ID_RE.is_match(user_id) {
            errors.push(ValidationError::new(
                "user_id",
                "must be 4-20 characters of letters, digits, '_' or '-'",
            ));
        }
        let len = password.chars().count();
        if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
            errors.push(ValidationError::new(
                "password",
                format!("must be {MIN_PASSWORD_LEN}-{MAX_PASSWORD_LEN} characters"),
            ));
        }
        finish(errors)
    }
}

/// Validates comment bodies.
pub struct CommentValidator;

impl CommentValidator {
    /// # Errors
    ///
    /// Returns an error if the content is blank or too long.
    pub fn validate(content: &str) -> Outcome {
        let mut errors = Vec::new();
        if content.trim().is_empty() {
            errors.push(ValidationError::new("content", "cannot be empty"));
        } else if content.chars().count() > MAX_COMMENT_LEN {
            errors.push(ValidationError::new(
                "content",
                format!("exceeds {MAX_COMMENT_LEN} characters"),
            ));
        }
        finish(errors)
    }
}

/// Saved filter names: non-empty, at most 100 characters.
///
/// # Errors
///
/// Returns an error if the name is blank or too long.
pub fn validate_filter_name(name: &str) -> Outcome {
    let mut errors = Vec::new();
    if name.trim().is_empty() {
        errors.push(ValidationError::new("name", "cannot be empty"));
    } else if name.chars().count() > MAX_FILTER_NAME_LEN {
        errors.push(ValidationError::new(
            "name",
            format!("exceeds {MAX_FILTER_NAME_LEN} characters"),
        ));
    }
    finish(errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str, text: &str, bg: &str) -> LabelDraft {
        LabelDraft {
            name: name.to_string(),
            description: None,
            text_color: text.to_string(),
            bg_color: bg.to_string(),
        }
    }

    #[test]
    fn color_format() {
        assert!(is_valid_color("#D73A4A"));
        assert!(is_valid_color("#ffffff"));
        assert!(!is_valid_color("D73A4A"));
        assert!(!is_valid_color("#FFF"));
        assert!(!is_valid_color("#GGGGGG"));
        assert!(!is_valid_color("#FFFFFF0"));
    }

    #[test]
    fn label_reports_every_problem() {
        let errors = LabelValidator::validate(&draft("  ", "red", "#12")).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "text_color", "bg_color"]);

        assert!(LabelValidator::validate(&draft("bug", "#FFFFFF", "#D73A4A")).is_ok());
        let long = "x".repeat(MAX_LABEL_NAME_LEN + 1);
        assert!(LabelValidator::validate(&draft(&long, "#FFFFFF", "#000000")).is_err());
    }

    #[test]
    fn issue_title_rules() {
        assert!(IssueValidator::validate_title("Crash on save").is_ok());
        assert!(IssueValidator::validate_title("   ").is_err());
        assert!(IssueValidator::validate_title(&"t".repeat(MAX_TITLE_LEN)).is_ok());
        assert!(IssueValidator::validate_title(&"t".repeat(MAX_TITLE_LEN + 1)).is_err());
    }

    #[test]
    fn user_rules() {
        assert!(UserValidator::validate("alice", "secret").is_ok());
        assert!(UserValidator::validate("a_b-9", "1234").is_ok());

        let errors = UserValidator::validate("al", "abc").unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(UserValidator::validate("alice smith", "secret").is_err());
        assert!(UserValidator::validate(&"u".repeat(21), "secret").is_err());
        assert!(UserValidator::validate("alice", &"p".repeat(65)).is_err());
    }

    #[test]
    fn comment_rules() {
        assert!(CommentValidator::validate("looks good").is_ok());
        assert!(CommentValidator::validate("\n\t ").is_err());
        assert!(CommentValidator::validate(&"c".repeat(MAX_COMMENT_LEN + 1)).is_err());
    }

    #[test]
    fn filter_name_rules() {
        assert!(validate_filter_name("my bugs").is_ok());
        assert!(validate_filter_name("").is_err());
    }
}
