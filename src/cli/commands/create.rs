use super::{print_json, resolve_actor, resolve_label_ids, resolve_milestone};
use crate::cli::CreateArgs;
use crate::config;
use crate::error::Result;
use crate::storage::{NewIssue, SqliteStorage};

/// Build the issue from CLI arguments, resolving label names and milestone titles.
fn build_new_issue(storage: &SqliteStorage, args: &CreateArgs) -> Result<NewIssue> {
    let milestone_id = args
        .milestone
        .as_deref()
        .map(|m| resolve_milestone(storage, m).map(|milestone| milestone.id))
        .transpose()?;

    Ok(NewIssue {
        title: args.title.clone(),
        content: args.content.clone(),
        milestone_id,
        label_ids: resolve_label_ids(storage, &args.labels)?,
        assignee_ids: args
            .assignees
            .iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect(),
    })
}

/// Execute the create command.
///
/// # Errors
///
/// Returns an error if validation fails, a reference is unknown, or the
/// database write fails.
pub fn execute(args: &CreateArgs, json: bool, cli: &config::CliOverrides) -> Result<()> {
    let (mut storage, config) = config::open_storage(cli)?;
    let author = resolve_actor(&storage, &config)?;

    let new_issue = build_new_issue(&storage, args)?;
    let issue_id = storage.create_issue(&new_issue, &author)?;

    if json {
        let detail = storage.get_issue_detail(issue_id)?;
        print_json(&detail)
    } else {
        println!("Created issue #{issue_id}: {}", new_issue.title.trim());
        Ok(())
    }
}
