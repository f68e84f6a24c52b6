//! Plain-text formatting for terminal output.
//!
//! - State icons (○ open, ✓ closed)
//! - Label chips in the label's own colors
//! - Milestone progress bars
//! - Width-aware title truncation

use crate::model::{Event, Issue, Label, Milestone};
use crate::util::format_relative;
use chrono::{DateTime, Utc};
use colored::Colorize;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// State icon characters.
pub mod icons {
    /// Open issue or milestone.
    pub const OPEN: &str = "○";
    /// Closed issue or milestone.
    pub const CLOSED: &str = "✓";
}

const PROGRESS_BAR_WIDTH: usize = 20;

/// Formatting options for text output.
#[derive(Debug, Clone, Copy)]
pub struct TextFormatOptions {
    pub use_color: bool,
    pub max_width: Option<usize>,
}

impl TextFormatOptions {
    #[must_use]
    pub const fn plain() -> Self {
        Self {
            use_color: false,
            max_width: None,
        }
    }
}

#[must_use]
pub const fn format_state_icon(is_closed: bool) -> &'static str {
    if is_closed { icons::CLOSED } else { icons::OPEN }
}

/// "open" or "closed", green or magenta when colored.
#[must_use]
pub fn format_state_label(is_closed: bool, use_color: bool) -> String {
    let label = if is_closed { "closed" } else { "open" };
    if !use_color {
        return label.to_string();
    }
    if is_closed {
        label.magenta().to_string()
    } else {
        label.green().to_string()
    }
}

/// State icon, green when open and magenta when closed.
#[must_use]
pub fn format_state_icon_colored(is_closed: bool, use_color: bool) -> String {
    let icon = format_state_icon(is_closed);
    if !use_color {
        return icon.to_string();
    }
    if is_closed {
        icon.magenta().to_string()
    } else {
        icon.green().to_string()
    }
}

fn hex_to_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(digits.get(range)?, 16).ok();
    Some((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

/// `[name]`, or the name on the label's background in 24-bit color.
#[must_use]
pub fn format_label_chip(label: &Label, use_color: bool) -> String {
    if !use_color {
        return format!("[{}]", label.name);
    }
    match (hex_to_rgb(&label.text_color), hex_to_rgb(&label.bg_color)) {
        (Some((fr, fg, fb)), Some((br, bg, bb))) => format!(" {} ", label.name)
            .truecolor(fr, fg, fb)
            .on_truecolor(br, bg, bb)
            .to_string(),
        _ => format!("[{}]", label.name),
    }
}

/// Space-separated label chips.
#[must_use]
pub fn format_label_chips(labels: &[Label], use_color: bool) -> String {
    labels
        .iter()
        .map(|label| format_label_chip(label, use_color))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `[#####---------------] 25% (1/4)`
#[must_use]
pub fn format_progress_bar(milestone: &Milestone) -> String {
    let percent = usize::try_from(milestone.progress_percent()).unwrap_or(0);
    let filled = (percent * PROGRESS_BAR_WIDTH) / 100;
    format!(
        "[{}{}] {percent}% ({}/{})",
        "#".repeat(filled),
        "-".repeat(PROGRESS_BAR_WIDTH - filled),
        milestone.closed_issues,
        milestone.total_issues
    )
}

/// One line per milestone: icon, id, title, deadline, progress.
#[must_use]
pub fn format_milestone_line(milestone: &Milestone, use_color: bool) -> String {
    let deadline = milestone.deadline.map_or_else(
        || {
            if use_color {
                "no deadline".dimmed().to_string()
            } else {
                "no deadline".to_string()
            }
        },
        |d| format!("due {d}"),
    );
    format!(
        "{} {} {}  {deadline}  {}",
        format_state_icon(milestone.is_closed),
        milestone.id,
        milestone.title,
        format_progress_bar(milestone)
    )
}

/// Determine terminal width from environment (falls back to 80).
#[must_use]
pub fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|columns| columns.trim().parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(80)
}

fn take_width(text: &str, max: usize) -> String {
    let mut width = 0;
    let mut out = String::new();
    for c in text.chars() {
        let cw = UnicodeWidthChar::width(c).unwrap_or(0);
        if width + cw > max {
            break;
        }
        width += cw;
        out.push(c);
    }
    out
}

/// Truncate a title to fit within `max_len` visible columns.
#[must_use]
pub fn truncate_title(title: &str, max_len: usize) -> String {
    if UnicodeWidthStr::width(title) <= max_len {
        return title.to_string();
    }
    if max_len <= 3 {
        return take_width(title, max_len);
    }
    let mut truncated = take_width(title, max_len - 3);
    truncated.push_str("...");
    truncated
}

/// Format: `{icon} #{id} {title}`
#[must_use]
pub fn format_issue_line_with(issue: &Issue, options: TextFormatOptions) -> String {
    let icon = format_state_icon(issue.is_closed);
    let id = format!("#{}", issue.id);
    let prefix_len = UnicodeWidthStr::width(icon) + 1 + id.len() + 1;

    let title = options.max_width.map_or_else(
        || issue.title.clone(),
        |width| truncate_title(&issue.title, width.saturating_sub(prefix_len)),
    );
    let icon = format_state_icon_colored(issue.is_closed, options.use_color);

    format!("{icon} {id} {title}")
}

#[must_use]
pub fn format_issue_line(issue: &Issue) -> String {
    format_issue_line_with(issue, TextFormatOptions::plain())
}

/// `opened 3d ago by alice` or `closed 2h ago`.
#[must_use]
pub fn format_issue_meta(issue: &Issue, now: DateTime<Utc>) -> String {
    match (issue.is_closed, issue.closed_at) {
        (true, Some(closed_at)) => format!(
            "opened {} by {}, closed {}",
            format_relative(issue.published_at, now),
            issue.author,
            format_relative(closed_at, now)
        ),
        _ => format!(
            "opened {} by {}",
            format_relative(issue.published_at, now),
            issue.author
        ),
    }
}

/// One line of an issue's audit history.
#[must_use]
pub fn format_event_line(event: &Event, now: DateTime<Utc>) -> String {
    let mut line = format!(
        "{}  {}  {}",
        format_relative(event.created_at, now),
        event.actor,
        event.event_type
    );
    match (&event.old_value, &event.new_value) {
        (Some(old), Some(new)) => line.push_str(&format!(": {old} -> {new}")),
        (None, Some(new)) => line.push_str(&format!(": {new}")),
        (Some(old), None) => line.push_str(&format!(": {old} -> (none)")),
        (None, None) => {}
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EventType;
    use chrono::{Duration, TimeZone};

    fn make_issue() -> Issue {
        Issue {
            id: 7,
            title: "Test title".to_string(),
            author: "alice".to_string(),
            published_at: Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap(),
            is_closed: false,
            closed_at: None,
            milestone_id: None,
        }
    }

    fn make_milestone(total: i64, closed: i64) -> Milestone {
        Milestone {
            id: 1,
            title: "v1".to_string(),
            description: None,
            deadline: None,
            is_closed: false,
            total_issues: total,
            closed_issues: closed,
        }
    }

    #[test]
    fn test_state_icons() {
        assert_eq!(format_state_icon(false), "○");
        assert_eq!(format_state_icon(true), "✓");
        assert_eq!(format_state_label(true, false), "closed");
    }

    #[test]
    fn test_format_issue_line() {
        let mut issue = make_issue();
        assert_eq!(format_issue_line(&issue), "○ #7 Test title");
        issue.is_closed = true;
        assert!(format_issue_line(&issue).starts_with("✓"));
    }

    #[test]
    fn test_format_issue_line_with_truncation() {
        let mut issue = make_issue();
        issue.title = "A very long issue title that goes on".to_string();
        let options = TextFormatOptions {
            use_color: false,
            max_width: Some(20),
        };
        let line = format_issue_line_with(&issue, options);
        assert!(line.ends_with("..."));
        assert!(UnicodeWidthStr::width(line.as_str()) <= 20);
    }

    #[test]
    fn test_truncate_title() {
        assert_eq!(truncate_title("This is a long title", 10), "This is...");
        assert_eq!(truncate_title("short", 10), "short");
        assert_eq!(truncate_title("abcdef", 2), "ab");
        // Wide characters count double.
        assert_eq!(truncate_title("日本語のタイトル", 7), "日本...");
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(
            format_progress_bar(&make_milestone(4, 1)),
            "[#####---------------] 25% (1/4)"
        );
        assert!(format_progress_bar(&make_milestone(0, 0)).contains("0% (0/0)"));
        assert!(format_progress_bar(&make_milestone(3, 3)).contains("100%"));
    }

    #[test]
    fn test_label_chip() {
        let label = Label {
            id: 1,
            name: "bug".to_string(),
            description: None,
            text_color: "#FFFFFF".to_string(),
            bg_color: "#D73A4A".to_string(),
        };
        assert_eq!(format_label_chip(&label, false), "[bug]");
        colored::control::set_override(true);
        let chip = format_label_chip(&label, true);
        assert!(chip.contains("38;2;255;255;255"));
        assert!(chip.contains("48;2;215;58;74"));
        assert!(chip.contains(" bug "));
    }

    #[test]
    fn test_colored_state() {
        colored::control::set_override(true);
        assert!(format_state_label(false, true).contains("\u{1b}[32m"));
        assert!(format_state_icon_colored(true, true).contains("\u{1b}[35m"));
        assert_eq!(format_state_icon_colored(true, false), "✓");
    }

    #[test]
    fn test_issue_meta() {
        let mut issue = make_issue();
        let now = issue.published_at + Duration::days(3);
        assert_eq!(format_issue_meta(&issue, now), "opened 3d ago by alice");
        issue.is_closed = true;
        issue.closed_at = Some(now - Duration::hours(2));
        assert!(format_issue_meta(&issue, now).ends_with("closed 2h ago"));
    }

    #[test]
    fn test_event_line() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let event = Event {
            id: 1,
            issue_id: 7,
            event_type: EventType::TitleChanged,
            actor: "bob1".to_string(),
            old_value: Some("old".to_string()),
            new_value: Some("new".to_string()),
            created_at: now,
        };
        let line = format_event_line(&event, now);
        assert!(line.contains("bob1"));
        assert!(line.ends_with(": old -> new"));
    }
}
