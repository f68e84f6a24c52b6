use super::{print_json, use_color};
use crate::config;
use crate::error::Result;
use crate::format::{format_issue_meta, format_label_chips, format_state_label};
use crate::model::IssueDetail;
use chrono::{DateTime, Utc};

/// Execute the show command.
///
/// # Errors
///
/// Returns `IssueNotFound` if the issue does not exist.
pub fn execute(id: i64, json: bool, no_color: bool, cli: &config::CliOverrides) -> Result<()> {
    let (storage, _config) = config::open_storage(cli)?;
    let detail = storage.get_issue_detail(id)?;

    if json {
        return print_json(&detail);
    }
    print!("{}", render(&detail, Utc::now(), use_color(no_color)));
    Ok(())
}

fn render(detail: &IssueDetail, now: DateTime<Utc>, color: bool) -> String {
    let issue = &detail.issue;
    let mut out = format!(
        "#{} {} [{}]\n{}\n",
        issue.id,
        issue.title,
        format_state_label(issue.is_closed, color),
        format_issue_meta(issue, now)
    );

    if !detail.labels.is_empty() {
        out.push_str(&format!(
            "Labels: {}\n",
            format_label_chips(&detail.labels, color)
        ));
    }
    if !detail.assignees.is_empty() {
        out.push_str(&format!("Assignees: {}\n", detail.assignees.join(", ")));
    }
    if let Some(milestone) = &detail.milestone {
        out.push_str(&format!("Milestone: {}\n", milestone.title));
    }

    for comment in &detail.comments {
        let edited = if comment.edited_at.is_some() {
            " (edited)"
        } else {
            ""
        };
        out.push_str(&format!(
            "\n--- {} commented {}{edited} [{}]\n{}\n",
            comment.author,
            crate::util::format_relative(comment.published_at, now),
            comment.id,
            comment.content
        ));
    }
    out
}
