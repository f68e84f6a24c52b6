use crate::config::{CONFIG_FILENAME, DEFAULT_DB_FILENAME, TRACKER_DIR_NAME};
use crate::error::{Result, TrackerError};
use crate::storage::SqliteStorage;
use std::fs;
use std::path::Path;

const CONFIG_TEMPLATE: &str = r"# Issue tracker configuration
# actor: alice
# page-size: 10
# bind: 127.0.0.1:8080
# session-ttl: 1800
# log-format: text
";

const GITIGNORE: &str = r"# Database
*.db
*.db-shm
*.db-wal

# CLI session token
session
";

/// Execute the init command.
///
/// # Errors
///
/// Returns an error if the directory or database cannot be created, or the
/// workspace already has a database and `force` is not set.
pub fn execute(force: bool, root_dir: Option<&Path>, json: bool) -> Result<()> {
    let base_dir = root_dir.unwrap_or_else(|| Path::new("."));
    let tracker_dir = base_dir.join(TRACKER_DIR_NAME);
    let db_path = tracker_dir.join(DEFAULT_DB_FILENAME);

    if tracker_dir.exists() {
        if db_path.exists() {
            if !force {
                return Err(TrackerError::AlreadyInitialized { path: db_path });
            }
            for suffix in ["", "-wal", "-shm"] {
                let path = tracker_dir.join(format!("{DEFAULT_DB_FILENAME}{suffix}"));
                if path.exists() {
                    fs::remove_file(path)?;
                }
            }
        }
    } else {
        fs::create_dir(&tracker_dir)?;
    }

    // Creates the file and applies the schema.
    SqliteStorage::open(&db_path)?;

    let config_path = tracker_dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        fs::write(config_path, CONFIG_TEMPLATE)?;
    }
    let gitignore_path = tracker_dir.join(".gitignore");
    if !gitignore_path.exists() {
        fs::write(gitignore_path, GITIGNORE)?;
    }

    tracing::info!(path = %db_path.display(), force, "Initialized workspace");
    if json {
        super::print_json(&serde_json::json!({
            "initialized": true,
            "database": db_path.display().to_string(),
        }))?;
    } else {
        println!("Initialized issue tracker in {TRACKER_DIR_NAME}/");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_workspace() {
        let temp_dir = TempDir::new().unwrap();
        execute(false, Some(temp_dir.path()), false).unwrap();

        let dir = temp_dir.path().join(TRACKER_DIR_NAME);
        assert!(dir.join(DEFAULT_DB_FILENAME).exists());
        assert!(dir.join(CONFIG_FILENAME).exists());
        assert!(dir.join(".gitignore").exists());
    }

    #[test]
    fn test_init_fails_if_already_initialized() {
        let temp_dir = TempDir::new().unwrap();
        execute(false, Some(temp_dir.path()), false).unwrap();

        assert!(matches!(
            execute(false, Some(temp_dir.path()), false),
            Err(TrackerError::AlreadyInitialized { .. })
        ));
    }

    #[test]
    fn test_init_force_starts_fresh() {
        let temp_dir = TempDir::new().unwrap();
        execute(false, Some(temp_dir.path()), false).unwrap();
        let db_path = temp_dir
            .path()
            .join(TRACKER_DIR_NAME)
            .join(DEFAULT_DB_FILENAME);
        {
            let mut storage = SqliteStorage::open(&db_path).unwrap();
            storage.register_user("alice", "pw1234").unwrap();
        }

        execute(true, Some(temp_dir.path()), false).unwrap();
        let storage = SqliteStorage::open(&db_path).unwrap();
        assert!(storage.list_user_ids().unwrap().is_empty());
    }
}
