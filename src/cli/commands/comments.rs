use super::{joined_text, print_json, resolve_actor};
use crate::cli::{CommentAddArgs, CommentCommands, CommentEditArgs};
use crate::config;
use crate::error::Result;
use crate::model::Comment;
use crate::storage::SqliteStorage;
use crate::util::format_relative;
use chrono::Utc;

/// Execute the comment command.
///
/// # Errors
///
/// Returns an error if the issue or comment is unknown, the text is
/// invalid, or the caller may not edit the comment.
pub fn execute(command: &CommentCommands, json: bool, cli: &config::CliOverrides) -> Result<()> {
    let (mut storage, config) = config::open_storage(cli)?;

    match command {
        CommentCommands::Add(args) => {
            let actor = resolve_actor(&storage, &config)?;
            let comment = add_comment(&mut storage, args, &actor)?;
            report(&comment, "Added", json)
        }
        CommentCommands::Edit(args) => {
            let actor = resolve_actor(&storage, &config)?;
            let comment = edit_comment(&mut storage, args, &actor)?;
            report(&comment, "Edited", json)
        }
        CommentCommands::List { id } => {
            let comments = storage.get_comments(*id)?;
            if json {
                return print_json(&comments);
            }
            let now = Utc::now();
            for comment in &comments {
                let edited = if comment.edited_at.is_some() {
                    " (edited)"
                } else {
                    ""
                };
                println!(
                    "[{}] {} {}{edited}:\n{}\n",
                    comment.id,
                    comment.author,
                    format_relative(comment.published_at, now),
                    comment.content
                );
            }
            Ok(())
        }
    }
}

fn add_comment(storage: &mut SqliteStorage, args: &CommentAddArgs, actor: &str) -> Result<Comment> {
    let text = joined_text(&args.text, args.message.as_ref());
    storage.add_comment(args.id, actor, &text)
}

fn edit_comment(
    storage: &mut SqliteStorage,
    args: &CommentEditArgs,
    actor: &str,
) -> Result<Comment> {
    let text = joined_text(&args.text, None);
    storage.edit_comment(args.comment_id, actor, &text)
}

fn report(comment: &Comment, verb: &str, json: bool) -> Result<()> {
    if json {
        return print_json(comment);
    }
    println!(
        "{verb} comment {} on #{}",
        comment.id, comment.issue_id
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrackerError;
    use crate::storage::NewIssue;

    #[test]
    fn message_flag_wins_over_words() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        storage.register_user("alice", "pw1234").unwrap();
        let id = storage.create_issue(&NewIssue::titled("a"), "alice").unwrap();

        let args = CommentAddArgs {
            id,
            text: vec!["ignored".to_string()],
            message: Some("from flag".to_string()),
        };
        assert_eq!(add_comment(&mut storage, &args, "alice").unwrap().content, "from flag");

        let args = CommentAddArgs {
            id,
            text: vec!["two".to_string(), "words".to_string()],
            message: None,
        };
        let comment = add_comment(&mut storage, &args, "alice").unwrap();
        assert_eq!(comment.content, "two words");

        let empty = CommentAddArgs {
            id,
            text: vec![],
            message: None,
        };
        assert!(matches!(
            add_comment(&mut storage, &empty, "alice"),
            Err(TrackerError::Validation { .. })
        ));
    }
}
