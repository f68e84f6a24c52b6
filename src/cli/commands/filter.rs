//! Filter command implementation.
//!
//! `issues filter [predicates]` runs the filter composer directly; the
//! subcommands summarize the tracker and manage the caller's saved filters.

use super::{print_json, resolve_actor, use_color};
use crate::cli::{FilterArgs, FilterCommands};
use crate::config;
use crate::error::Result;
use crate::format::{
    TextFormatOptions, format_issue_line_with, format_label_chips, format_progress_bar,
    terminal_width,
};
use crate::model::{FilterSummary, Issue};
use crate::storage::IssueFilter;

/// Execute the filter command.
///
/// # Errors
///
/// Returns an error if the caller cannot be resolved (saved filters), the
/// saved filter is unknown, or a query fails.
pub fn execute(
    args: &FilterArgs,
    json: bool,
    no_color: bool,
    cli: &config::CliOverrides,
) -> Result<()> {
    let (mut storage, config) = config::open_storage(cli)?;
    let color = use_color(no_color);

    match &args.command {
        None => {
            let filter = IssueFilter::from(&args.criteria);
            let issues = storage.list_filtered(&filter)?;
            print_issues(&issues, json, color)
        }
        Some(FilterCommands::Summary) => {
            let summary = storage.filter_summary()?;
            if json {
                print_json(&summary)
            } else {
                print_summary(&summary, color);
                Ok(())
            }
        }
        Some(FilterCommands::Save { name, criteria }) => {
            let owner = resolve_actor(&storage, &config)?;
            let saved = storage.save_filter(&owner, name, &IssueFilter::from(criteria))?;
            if json {
                print_json(&saved)
            } else {
                println!("Saved filter {} as '{}'", saved.id, saved.name);
                Ok(())
            }
        }
        Some(FilterCommands::Saved) => {
            let owner = resolve_actor(&storage, &config)?;
            let filters = storage.list_saved_filters(&owner)?;
            if json {
                return print_json(&filters);
            }
            if filters.is_empty() {
                println!("No saved filters.");
            }
            for saved in &filters {
                println!(
                    "{:>4}  {}  {}",
                    saved.id,
                    saved.name,
                    describe(&saved.filter)
                );
            }
            Ok(())
        }
        Some(FilterCommands::Delete { id }) => {
            let owner = resolve_actor(&storage, &config)?;
            storage.delete_saved_filter(&owner, *id)?;
            if json {
                print_json(&serde_json::json!({ "deleted": id }))
            } else {
                println!("Deleted saved filter {id}");
                Ok(())
            }
        }
        Some(FilterCommands::Apply { id }) => {
            let owner = resolve_actor(&storage, &config)?;
            let issues = storage.apply_saved_filter(&owner, *id)?;
            print_issues(&issues, json, color)
        }
    }
}

/// Human description of a filter's predicates.
fn describe(filter: &IssueFilter) -> String {
    if filter.is_empty() {
        return "(all issues)".to_string();
    }
    let mut parts = Vec::new();
    match filter.is_closed {
        Some(true) => parts.push("closed".to_string()),
        Some(false) => parts.push("open".to_string()),
        None => {}
    }
    if let Some(assignee) = &filter.assignee {
        parts.push(format!("assignee:{assignee}"));
    }
    for label in &filter.labels {
        parts.push(format!("label:{label}"));
    }
    if let Some(milestone) = &filter.milestone {
        parts.push(format!("milestone:{milestone}"));
    }
    if let Some(author) = &filter.author {
        parts.push(format!("author:{author}"));
    }
    parts.join(" ")
}

fn print_issues(issues: &[Issue], json: bool, color: bool) -> Result<()> {
    if json {
        return print_json(issues);
    }
    if issues.is_empty() {
        println!("No matching issues.");
        return Ok(());
    }
    let options = TextFormatOptions {
        use_color: color,
        max_width: Some(terminal_width()),
    };
    for issue in issues {
        println!("{}", format_issue_line_with(issue, options));
    }
    println!("\n{} matching", issues.len());
    Ok(())
}

fn print_summary(summary: &FilterSummary, color: bool) {
    println!(
        "Issues: {} open, {} closed",
        summary.counts.open, summary.counts.closed
    );
    if !summary.labels.is_empty() {
        println!("Labels: {}", format_label_chips(&summary.labels, color));
    }
    if !summary.milestones.is_empty() {
        println!("Open milestones:");
        for milestone in &summary.milestones {
            println!("  {}  {}", milestone.title, format_progress_bar(milestone));
        }
    }
    if !summary.authors.is_empty() {
        println!("Authors: {}", summary.authors.join(", "));
    }
}
