//! Output formatting for `issue_tracker`.
//!
//! Human-readable text goes through [`text`]; `--json` output serializes the
//! model types directly or through the envelopes in [`output`].

mod output;
mod text;

pub use output::{IssueHistory, MilestoneProgress, StateChangeReport};
pub use text::{
    TextFormatOptions, format_event_line, format_issue_line, format_issue_line_with,
    format_issue_meta, format_label_chip, format_label_chips, format_milestone_line,
    format_progress_bar, format_state_icon, format_state_icon_colored, format_state_label,
    terminal_width, truncate_title,
};
