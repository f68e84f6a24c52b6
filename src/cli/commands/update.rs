use super::{print_json, resolve_actor, resolve_label_ids, resolve_milestone};
use crate::cli::UpdateArgs;
use crate::config;
use crate::error::{Result, TrackerError};
use crate::storage::SqliteStorage;

/// Apply each requested change in order. Every change is its own unit.
fn apply_updates(storage: &mut SqliteStorage, args: &UpdateArgs, actor: &str) -> Result<Vec<&'static str>> {
    let mut applied = Vec::new();

    if let Some(title) = &args.title {
        storage.update_title(args.id, title, actor)?;
        applied.push("title");
    }
    if let Some(labels) = &args.labels {
        let label_ids = resolve_label_ids(storage, labels)?;
        storage.set_labels(args.id, &label_ids, actor)?;
        applied.push("labels");
    }
    if let Some(assignees) = &args.assignees {
        let user_ids: Vec<String> = assignees
            .iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        storage.set_assignees(args.id, &user_ids, actor)?;
        applied.push("assignees");
    }
    if args.no_milestone {
        storage.reassign_milestone(args.id, None, actor)?;
        applied.push("milestone");
    } else if let Some(milestone) = &args.milestone {
        let milestone_id = resolve_milestone(storage, milestone)?.id;
        storage.reassign_milestone(args.id, Some(milestone_id), actor)?;
        applied.push("milestone");
    }

    Ok(applied)
}

/// Execute the update command.
///
/// # Errors
///
/// `Validation` when nothing is requested, otherwise any error the
/// individual updates raise.
pub fn execute(args: &UpdateArgs, json: bool, cli: &config::CliOverrides) -> Result<()> {
    let nothing_requested = args.title.is_none()
        && args.labels.is_none()
        && args.assignees.is_none()
        && args.milestone.is_none()
        && !args.no_milestone;
    if nothing_requested {
        return Err(TrackerError::validation(
            "update",
            "nothing to update: pass --title, --labels, --assignees, --milestone or --no-milestone",
        ));
    }

    let (mut storage, config) = config::open_storage(cli)?;
    let actor = resolve_actor(&storage, &config)?;
    let applied = apply_updates(&mut storage, args, &actor)?;

    if json {
        return print_json(&storage.get_issue_detail(args.id)?);
    }
    println!("Updated #{}: {}", args.id, applied.join(", "));
    Ok(())
}
