//! Database schema definitions and migration logic.

use rusqlite::{Connection, OptionalExtension, Result};

pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// The complete SQL schema for the tracker database.
pub const SCHEMA_SQL: &str = r"
    -- Users
    CREATE TABLE IF NOT EXISTS users (
        user_id TEXT PRIMARY KEY,
        password_hash TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    -- Sessions (expires_at is unix seconds)
    CREATE TABLE IF NOT EXISTS sessions (
        token TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        created_at TEXT NOT NULL,
        expires_at INTEGER NOT NULL,
        FOREIGN KEY (user_id) REFERENCES users(user_id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);

    -- Labels; names are unique ignoring case
    CREATE TABLE IF NOT EXISTS labels (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL COLLATE NOCASE UNIQUE,
        description TEXT,
        text_color TEXT NOT NULL,
        bg_color TEXT NOT NULL,
        CHECK (length(name) >= 1)
    );

    -- Milestones with denormalized counters
    CREATE TABLE IF NOT EXISTS milestones (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL UNIQUE,
        description TEXT,
        deadline TEXT,
        is_closed INTEGER NOT NULL DEFAULT 0,
        total_issues INTEGER NOT NULL DEFAULT 0,
        closed_issues INTEGER NOT NULL DEFAULT 0,
        CHECK (length(title) >= 1),
        CHECK (closed_issues >= 0 AND closed_issues <= total_issues)
    );

    -- Issues
    CREATE TABLE IF NOT EXISTS issues (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        author TEXT NOT NULL,
        published_at TEXT NOT NULL,
        is_closed INTEGER NOT NULL DEFAULT 0,
        closed_at TEXT,
        milestone_id INTEGER,
        CHECK (length(title) >= 1),
        FOREIGN KEY (author) REFERENCES users(user_id),
        FOREIGN KEY (milestone_id) REFERENCES milestones(id) ON DELETE SET NULL
    );
    CREATE INDEX IF NOT EXISTS idx_issues_is_closed ON issues(is_closed);
    CREATE INDEX IF NOT EXISTS idx_issues_author ON issues(author);
    CREATE INDEX IF NOT EXISTS idx_issues_milestone_id ON issues(milestone_id);
    CREATE INDEX IF NOT EXISTS idx_issues_published_at ON issues(published_at);

    -- Issue <-> label association
    CREATE TABLE IF NOT EXISTS issue_labels (
        issue_id INTEGER NOT NULL,
        label_id INTEGER NOT NULL,
        PRIMARY KEY (issue_id, label_id),
        FOREIGN KEY (issue_id) REFERENCES issues(id) ON DELETE CASCADE,
        FOREIGN KEY (label_id) REFERENCES labels(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_issue_labels_label_id ON issue_labels(label_id);

    -- Issue <-> assignee association
    CREATE TABLE IF NOT EXISTS issue_assignees (
        issue_id INTEGER NOT NULL,
        user_id TEXT NOT NULL,
        PRIMARY KEY (issue_id, user_id),
        FOREIGN KEY (issue_id) REFERENCES issues(id) ON DELETE CASCADE,
        FOREIGN KEY (user_id) REFERENCES users(user_id)
    );
    CREATE INDEX IF NOT EXISTS idx_issue_assignees_user_id ON issue_assignees(user_id);

    -- Comments
    CREATE TABLE IF NOT EXISTS comments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        issue_id INTEGER NOT NULL,
        author TEXT NOT NULL,
        content TEXT NOT NULL,
        published_at TEXT NOT NULL,
        edited_at TEXT,
        FOREIGN KEY (issue_id) REFERENCES issues(id) ON DELETE CASCADE,
        FOREIGN KEY (author) REFERENCES users(user_id)
    );
    CREATE INDEX IF NOT EXISTS idx_comments_issue_id ON comments(issue_id);

    -- Events (Audit)
    CREATE TABLE IF NOT EXISTS events (
        id INTEGER PRIMARY KEY,
        issue_id INTEGER NOT NULL,
        event_type TEXT NOT NULL,
        actor TEXT NOT NULL,
        old_value TEXT,
        new_value TEXT,
        created_at TEXT NOT NULL,
        FOREIGN KEY (issue_id) REFERENCES issues(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_events_issue_id ON events(issue_id);
    CREATE INDEX IF NOT EXISTS idx_events_event_type ON events(event_type);

    -- Saved filters; criteria is the JSON form of IssueFilter
    CREATE TABLE IF NOT EXISTS saved_filters (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner TEXT NOT NULL,
        name TEXT NOT NULL,
        criteria TEXT NOT NULL,
        created_at TEXT NOT NULL,
        UNIQUE (owner, name),
        FOREIGN KEY (owner) REFERENCES users(user_id) ON DELETE CASCADE
    );

    -- Metadata
    CREATE TABLE IF NOT EXISTS metadata (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
";

/// Apply the schema to the database.
///
/// This uses `execute_batch` to run the entire DDL script.
/// It is idempotent because all statements use `IF NOT EXISTS`.
///
/// # Errors
///
/// Returns an error if the SQL execution fails or pragmas cannot be set.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    // Set journal mode to WAL for concurrency
    conn.pragma_update(None, "journal_mode", "WAL")?;

    apply_connection_pragmas(conn)?;

    conn.execute_batch(SCHEMA_SQL)?;

    run_migrations(conn)?;

    Ok(())
}

/// Pragmas that do not persist in the database file and must be set on
/// every new connection.
///
/// # Errors
///
/// Returns an error if a pragma cannot be set.
pub fn apply_connection_pragmas(conn: &Connection) -> Result<()> {
    // Required for ON DELETE SET NULL / CASCADE
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(())
}

/// Record the schema version, upgrading older databases when needed.
fn run_migrations(conn: &Connection) -> Result<()> {
    let stored: Option<String> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()?;

    let version = stored.and_then(|v| v.parse::<i32>().ok()).unwrap_or(0);
    if version < CURRENT_SCHEMA_VERSION {
        conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?)",
            [CURRENT_SCHEMA_VERSION.to_string()],
        )?;
    }

    Ok(())
}
