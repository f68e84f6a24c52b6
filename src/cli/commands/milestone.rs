//! Milestone command implementation.

use super::{print_json, resolve_actor, resolve_milestone};
use crate::cli::{MilestoneCommands, MilestoneCreateArgs, MilestoneUpdateArgs};
use crate::config;
use crate::error::Result;
use crate::format::{MilestoneProgress, format_milestone_line};
use crate::model::Milestone;
use crate::storage::{MilestoneDraft, MilestoneState, SqliteStorage};
use crate::util::parse_date;

/// Execute the milestone command.
///
/// # Errors
///
/// Returns an error if database operations fail or if inputs are invalid.
pub fn execute(
    command: &MilestoneCommands,
    json: bool,
    no_color: bool,
    cli: &config::CliOverrides,
) -> Result<()> {
    let (mut storage, config) = config::open_storage(cli)?;
    let color = super::use_color(no_color);

    let (milestone, verb) = match command {
        MilestoneCommands::List { state } => {
            return list(&storage, (*state).into(), json, color);
        }
        MilestoneCommands::Create(args) => {
            let actor = resolve_actor(&storage, &config)?;
            (storage.create_milestone(&create_draft(args)?, &actor)?, "Created")
        }
        MilestoneCommands::Update(args) => {
            let actor = resolve_actor(&storage, &config)?;
            (milestone_update(&mut storage, args, &actor)?, "Updated")
        }
        MilestoneCommands::Delete { milestone } => {
            let actor = resolve_actor(&storage, &config)?;
            let milestone = resolve_milestone(&storage, milestone)?;
            storage.delete_milestone(milestone.id, &actor)?;
            (milestone, "Deleted")
        }
        MilestoneCommands::Close { milestone } => {
            let actor = resolve_actor(&storage, &config)?;
            let id = resolve_milestone(&storage, milestone)?.id;
            (storage.close_milestone(id, &actor)?, "Closed")
        }
        MilestoneCommands::Reopen { milestone } => {
            let actor = resolve_actor(&storage, &config)?;
            let id = resolve_milestone(&storage, milestone)?.id;
            (storage.reopen_milestone(id, &actor)?, "Reopened")
        }
    };

    report(milestone, verb, json, color)
}

fn list(storage: &SqliteStorage, state: MilestoneState, json: bool, color: bool) -> Result<()> {
    let milestones = storage.list_milestones(state)?;
    if json {
        let listing: Vec<MilestoneProgress> =
            milestones.into_iter().map(MilestoneProgress::from).collect();
        return print_json(&listing);
    }
    if milestones.is_empty() {
        println!("No milestones.");
    }
    for milestone in &milestones {
        println!("{}", format_milestone_line(milestone, color));
    }
    Ok(())
}

fn create_draft(args: &MilestoneCreateArgs) -> Result<MilestoneDraft> {
    Ok(MilestoneDraft {
        title: args.title.clone(),
        description: args.description.clone(),
        deadline: args
            .deadline
            .as_deref()
            .map(|d| parse_date(d, "deadline"))
            .transpose()?,
    })
}

/// Unset flags keep the milestone's current values.
fn milestone_update(
    storage: &mut SqliteStorage,
    args: &MilestoneUpdateArgs,
    actor: &str,
) -> Result<Milestone> {
    let current = resolve_milestone(storage, &args.milestone)?;
    let deadline = if args.no_deadline {
        None
    } else {
        match &args.deadline {
            Some(d) => Some(parse_date(d, "deadline")?),
            None => current.deadline,
        }
    };
    let draft = MilestoneDraft {
        title: args.title.clone().unwrap_or_else(|| current.title.clone()),
        description: match &args.description {
            Some(d) if d.trim().is_empty() => None,
            Some(d) => Some(d.clone()),
            None => current.description.clone(),
        },
        deadline,
    };
    storage.update_milestone(current.id, &draft, actor)
}

fn report(milestone: Milestone, verb: &str, json: bool, color: bool) -> Result<()> {
    if json {
        return print_json(&MilestoneProgress::from(milestone));
    }
    println!("{verb} milestone");
    println!("{}", format_milestone_line(&milestone, color));
    Ok(())
}
