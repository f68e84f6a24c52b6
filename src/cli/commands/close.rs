//! Close and reopen commands.
//!
//! Both take several ids and apply them as one unit: an unknown id aborts
//! the whole batch. Issues already in the target state are reported as
//! unchanged.

use super::{print_json, resolve_actor};
use crate::cli::StateArgs;
use crate::config;
use crate::error::Result;
use crate::format::StateChangeReport;

/// Execute `close` (`close = true`) or `reopen`.
///
/// # Errors
///
/// `IssueNotFound` naming the first missing id, or a database error.
pub fn execute(args: &StateArgs, close: bool, json: bool, cli: &config::CliOverrides) -> Result<()> {
    let (mut storage, config) = config::open_storage(cli)?;
    let actor = resolve_actor(&storage, &config)?;

    let changes = if close {
        storage.close_issues(&args.ids, &actor)?
    } else {
        storage.open_issues(&args.ids, &actor)?
    };
    let report = StateChangeReport::from(changes);

    if json {
        return print_json(&report);
    }

    let (verb, state) = if close {
        ("Closed", "closed")
    } else {
        ("Reopened", "open")
    };
    for change in &report.changes {
        if change.changed {
            println!("{verb} #{}", change.issue_id);
        } else {
            println!("#{} is already {state}", change.issue_id);
        }
    }
    Ok(())
}
