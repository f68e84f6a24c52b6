//! Time and date parsing utilities.

use crate::error::{Result, TrackerError};
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Parse a calendar date for milestone deadlines.
///
/// Supports:
/// - Simple date: `2025-01-15`
/// - Relative days or weeks from today: `+10d`, `+2w`
/// - Keywords: `today`, `tomorrow`
///
/// # Errors
///
/// Returns a validation error for `field_name` if the input is not recognised.
pub fn parse_date(s: &str, field_name: &str) -> Result<NaiveDate> {
    let s = s.trim();

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }

    let today = Local::now().date_naive();

    if let Some(rest) = s.strip_prefix('+') {
        let Some((split, _)) = rest.char_indices().last() else {
            return Err(TrackerError::validation(field_name, "invalid relative date"));
        };
        let (amount, unit) = rest.split_at(split);
        let amount: i64 = amount
            .parse()
            .map_err(|_| TrackerError::validation(field_name, "invalid relative date"))?;
        let delta = match unit {
            "d" => Duration::days(amount),
            "w" => Duration::weeks(amount),
            _ => {
                return Err(TrackerError::validation(
                    field_name,
                    "invalid unit (use d or w)",
                ));
            }
        };
        return Ok(today + delta);
    }

    match s.to_lowercase().as_str() {
        "today" => Ok(today),
        "tomorrow" => Ok(today + Duration::days(1)),
        _ => Err(TrackerError::validation(
            field_name,
            "expected YYYY-MM-DD, +Nd, +Nw, today or tomorrow",
        )),
    }
}

/// Parse a stored timestamp.
///
/// Rows are written as RFC3339; the plain `YYYY-MM-DD HH:MM:SS` form produced
/// by SQLite's `datetime()` is accepted too.
#[must_use]
pub fn parse_stored_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Utc.from_utc_datetime(&naive);
    }

    DateTime::<Utc>::UNIX_EPOCH
}

/// Short relative description ("just now", "5m ago", "3d ago").
#[must_use]
pub fn format_relative(dt: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - dt).num_seconds();
    if secs < 60 {
        "just now".to_string()
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else if secs < 86_400 {
        format!("{}h ago", secs / 3600)
    } else if secs < 86_400 * 30 {
        format!("{}d ago", secs / 86_400)
    } else {
        dt.format("%Y-%m-%d").to_string()
    }
}
