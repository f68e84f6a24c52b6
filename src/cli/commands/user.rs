//! User command implementation: register, login, logout, list.
//!
//! `login` stores the session token in the workspace directory; later
//! commands act as that user unless `--actor` says otherwise.

use super::{print_json, session_path};
use crate::cli::{CredentialsArgs, UserCommands};
use crate::config::{self, Config};
use crate::error::{Result, TrackerError};
use crate::storage::SqliteStorage;
use std::fs;
use std::io;

/// Execute the user command.
///
/// # Errors
///
/// Returns an error if database operations fail or credentials are rejected.
pub fn execute(command: &UserCommands, json: bool, cli: &config::CliOverrides) -> Result<()> {
    let (mut storage, config) = config::open_storage(cli)?;

    match command {
        UserCommands::Register(args) => register(&mut storage, args, json),
        UserCommands::Login(args) => login(&mut storage, &config, args, json),
        UserCommands::Logout => logout(&mut storage, &config, json),
        UserCommands::List => {
            let ids = storage.list_user_ids()?;
            if json {
                print_json(&ids)
            } else {
                for id in ids {
                    println!("{id}");
                }
                Ok(())
            }
        }
    }
}

fn register(storage: &mut SqliteStorage, args: &CredentialsArgs, json: bool) -> Result<()> {
    let user = storage.register_user(&args.user_id, &args.password)?;
    if json {
        print_json(&user)
    } else {
        println!("Registered user {}", user.user_id);
        Ok(())
    }
}

fn login(
    storage: &mut SqliteStorage,
    config: &Config,
    args: &CredentialsArgs,
    json: bool,
) -> Result<()> {
    let path = session_path(config).ok_or(TrackerError::NotInitialized)?;
    let user = storage.authenticate(&args.user_id, &args.password)?;
    let session =
        storage.create_session(&user.user_id, chrono::Duration::seconds(config.session_ttl_secs))?;
    fs::write(&path, &session.token)?;

    tracing::info!(user_id = %user.user_id, expires_at = %session.expires_at, "Logged in");
    if json {
        print_json(&serde_json::json!({
            "user_id": user.user_id,
            "expires_at": session.expires_at,
        }))
    } else {
        println!(
            "Logged in as {} until {}",
            user.user_id,
            session.expires_at.format("%Y-%m-%d %H:%M UTC")
        );
        Ok(())
    }
}

fn logout(storage: &mut SqliteStorage, config: &Config, json: bool) -> Result<()> {
    let token = match session_path(config).map(fs::read_to_string) {
        Some(Ok(token)) => Some(token),
        Some(Err(e)) if e.kind() == io::ErrorKind::NotFound => None,
        Some(Err(e)) => return Err(e.into()),
        None => None,
    };

    let ended = match token {
        Some(token) => {
            let ended = storage.delete_session(token.trim())?;
            if let Some(path) = session_path(config) {
                fs::remove_file(path)?;
            }
            ended
        }
        None => false,
    };

    if json {
        print_json(&serde_json::json!({ "logged_out": ended }))
    } else {
        if ended {
            println!("Logged out");
        } else {
            println!("No active session");
        }
        Ok(())
    }
}
