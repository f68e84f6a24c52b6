//! Label command implementation.
//!
//! Provides catalog management: create, list, update, delete.

use super::{print_json, resolve_actor, resolve_label, use_color};
use crate::cli::{LabelCommands, LabelCreateArgs, LabelUpdateArgs};
use crate::config;
use crate::error::Result;
use crate::format::format_label_chip;
use crate::model::Label;
use crate::storage::{LabelDraft, SqliteStorage};

/// Execute the label command.
///
/// # Errors
///
/// Returns an error if database operations fail or if inputs are invalid.
pub fn execute(
    command: &LabelCommands,
    json: bool,
    no_color: bool,
    cli: &config::CliOverrides,
) -> Result<()> {
    let (mut storage, config) = config::open_storage(cli)?;

    match command {
        LabelCommands::List => {
            let labels = storage.list_labels()?;
            if json {
                return print_json(&labels);
            }
            if labels.is_empty() {
                println!("No labels.");
            }
            let color = use_color(no_color);
            for label in &labels {
                print_label(label, color);
            }
            Ok(())
        }
        LabelCommands::Create(args) => {
            let actor = resolve_actor(&storage, &config)?;
            let label = storage.create_label(&create_draft(args), &actor)?;
            report(&label, "Created", json, no_color)
        }
        LabelCommands::Update(args) => {
            let actor = resolve_actor(&storage, &config)?;
            let label = label_update(&mut storage, args, &actor)?;
            report(&label, "Updated", json, no_color)
        }
        LabelCommands::Delete { label } => {
            let actor = resolve_actor(&storage, &config)?;
            let label = resolve_label(&storage, label)?;
            storage.delete_label(label.id, &actor)?;
            report(&label, "Deleted", json, no_color)
        }
    }
}

fn create_draft(args: &LabelCreateArgs) -> LabelDraft {
    LabelDraft {
        name: args.name.clone(),
        description: args.description.clone(),
        text_color: args.text_color.clone(),
        bg_color: args.bg_color.clone(),
    }
}

/// Unset flags keep the label's current values.
fn label_update(storage: &mut SqliteStorage, args: &LabelUpdateArgs, actor: &str) -> Result<Label> {
    let current = resolve_label(storage, &args.label)?;
    let draft = LabelDraft {
        name: args.name.clone().unwrap_or_else(|| current.name.clone()),
        description: match &args.description {
            Some(d) if d.trim().is_empty() => None,
            Some(d) => Some(d.clone()),
            None => current.description.clone(),
        },
        text_color: args
            .text_color
            .clone()
            .unwrap_or_else(|| current.text_color.clone()),
        bg_color: args
            .bg_color
            .clone()
            .unwrap_or_else(|| current.bg_color.clone()),
    };
    storage.update_label(current.id, &draft, actor)
}

fn print_label(label: &Label, color: bool) {
    let description = label.description.as_deref().unwrap_or("");
    println!(
        "{:>4}  {}  {} on {}  {description}",
        label.id,
        format_label_chip(label, color),
        label.text_color,
        label.bg_color
    );
}

fn report(label: &Label, verb: &str, json: bool, no_color: bool) -> Result<()> {
    if json {
        return print_json(label);
    }
    println!(
        "{verb} label {} {}",
        label.id,
        format_label_chip(label, use_color(no_color))
    );
    Ok(())
}
