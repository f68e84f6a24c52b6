use super::print_json;
use crate::cli::HistoryArgs;
use crate::config;
use crate::error::Result;
use crate::format::{IssueHistory, format_event_line};
use chrono::Utc;

/// Execute the history command: an issue's audit events, newest first.
///
/// # Errors
///
/// `IssueNotFound` if the issue does not exist.
pub fn execute(args: &HistoryArgs, json: bool, cli: &config::CliOverrides) -> Result<()> {
    let (storage, _config) = config::open_storage(cli)?;
    let events = storage.get_events_limited(args.id, args.limit)?;

    if json {
        return print_json(&IssueHistory {
            issue_id: args.id,
            events,
        });
    }

    let now = Utc::now();
    println!("History of #{}", args.id);
    for event in &events {
        println!("  {}", format_event_line(event, now));
    }
    Ok(())
}
