//! User directory and sessions.

use super::sqlite::{SqliteStorage, is_unique_violation, now_rfc3339, placeholders};
use crate::error::{Result, TrackerError};
use crate::model::{Session, User};
use crate::util::{generate_session_token, hash_password, parse_stored_datetime, verify_password};
use crate::validation::UserValidator;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, OptionalExtension};

fn user_from_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        user_id: row.get(0)?,
        password_hash: row.get(1)?,
        created_at: parse_stored_datetime(&row.get::<_, String>(2)?),
    })
}

/// Fail with `UserNotFound` unless the user exists.
pub(super) fn ensure_user(conn: &Connection, user_id: &str) -> Result<()> {
    let exists = conn
        .prepare_cached("SELECT 1 FROM users WHERE user_id = ?")?
        .exists([user_id])?;
    if exists {
        Ok(())
    } else {
        Err(TrackerError::UserNotFound {
            id: user_id.to_string(),
        })
    }
}

/// Fail with `UserNotFound` naming the first id that does not exist.
pub(super) fn ensure_users(conn: &Connection, user_ids: &[String]) -> Result<()> {
    for id in user_ids {
        ensure_user(conn, id)?;
    }
    Ok(())
}

impl SqliteStorage {
    /// Register a new user with a salted password hash.
    ///
    /// # Errors
    ///
    /// - `Validation` if the id or password is malformed
    /// - `DuplicateUser` if the id is taken
    pub fn register_user(&mut self, user_id: &str, password: &str) -> Result<User> {
        UserValidator::validate(user_id, password).map_err(TrackerError::from_validation_errors)?;

        let password_hash = hash_password(password);
        let user = self.mutate("register_user", user_id, |tx, _ctx| {
            let created_at = now_rfc3339();
            tx.execute(
                "INSERT INTO users (user_id, password_hash, created_at) VALUES (?, ?, ?)",
                rusqlite::params![user_id, password_hash, created_at],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    TrackerError::DuplicateUser {
                        id: user_id.to_string(),
                    }
                } else {
                    e.into()
                }
            })?;
            Ok(User {
                user_id: user_id.to_string(),
                password_hash: password_hash.clone(),
                created_at: parse_stored_datetime(&created_at),
            })
        })?;

        tracing::info!(user_id = %user_id, "Registered user");
        Ok(user)
    }

    /// Verify a user's password. No side effects.
    ///
    /// # Errors
    ///
    /// - `UserNotFound` if the user is absent
    /// - `InvalidCredential` if the password does not match
    pub fn authenticate(&self, user_id: &str, password: &str) -> Result<User> {
        let user = self.get_user(user_id)?;
        if verify_password(password, &user.password_hash) {
            Ok(user)
        } else {
            tracing::warn!(user_id = %user_id, "Failed login");
            Err(TrackerError::InvalidCredential)
        }
    }

    /// Look up one user.
    ///
    /// # Errors
    ///
    /// `UserNotFound` if absent.
    pub fn get_user(&self, user_id: &str) -> Result<User> {
        self.conn
            .query_row(
                "SELECT user_id, password_hash, created_at FROM users WHERE user_id = ?",
                [user_id],
                user_from_row,
            )
            .optional()?
            .ok_or_else(|| TrackerError::UserNotFound {
                id: user_id.to_string(),
            })
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn user_exists(&self, user_id: &str) -> Result<bool> {
        Ok(self
            .conn
            .prepare_cached("SELECT 1 FROM users WHERE user_id = ?")?
            .exists([user_id])?)
    }

    /// All user ids, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_user_ids(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT user_id FROM users ORDER BY user_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    /// The subset of `user_ids` that exist, sorted by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn find_users(&self, user_ids: &[String]) -> Result<Vec<User>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT user_id, password_hash, created_at FROM users
             WHERE user_id IN ({}) ORDER BY user_id",
            placeholders(user_ids.len())
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let users = stmt
            .query_map(rusqlite::params_from_iter(user_ids), user_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }

    /// Start a session for `user_id` lasting `ttl`. Expired sessions are purged.
    ///
    /// # Errors
    ///
    /// `UserNotFound` if the user is absent.
    pub fn create_session(&mut self, user_id: &str, ttl: Duration) -> Result<Session> {
        let token = generate_session_token();
        let now = Utc::now();
        let expires_at = now + ttl;

        self.mutate("create_session", user_id, |tx, _ctx| {
            ensure_user(tx, user_id)?;
            tx.execute(
                "DELETE FROM sessions WHERE expires_at <= ?",
                [now.timestamp()],
            )?;
            tx.execute(
                "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
                rusqlite::params![token, user_id, now.to_rfc3339(), expires_at.timestamp()],
            )?;
            Ok(())
        })?;

        Ok(Session {
            token,
            user_id: user_id.to_string(),
            expires_at: DateTime::from_timestamp(expires_at.timestamp(), 0).unwrap_or(expires_at),
        })
    }

    /// Resolve a session token to its user id.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` for unknown or expired tokens.
    pub fn resolve_session(&self, token: &str) -> Result<String> {
        let row: Option<(String, i64)> = self
            .conn
            .query_row(
                "SELECT user_id, expires_at FROM sessions WHERE token = ?",
                [token],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((user_id, expires_at)) if expires_at > Utc::now().timestamp() => Ok(user_id),
            _ => Err(TrackerError::Unauthenticated),
        }
    }

    /// End a session. Returns false if the token was unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn delete_session(&mut self, token: &str) -> Result<bool> {
        self.mutate("delete_session", "", |tx, _ctx| {
            Ok(tx.execute("DELETE FROM sessions WHERE token = ?", [token])? > 0)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> SqliteStorage {
        SqliteStorage::open_memory().unwrap()
    }

    #[test]
    fn register_and_authenticate() {
        let mut s = storage();
        let user = s.register_user("alice", "s3cret").unwrap();
        assert_eq!(user.user_id, "alice");
        assert_ne!(user.password_hash, "s3cret");

        assert!(s.authenticate("alice", "s3cret").is_ok());
        assert!(matches!(
            s.authenticate("alice", "wrong"),
            Err(TrackerError::InvalidCredential)
        ));
        assert!(matches!(
            s.authenticate("nobody", "s3cret"),
            Err(TrackerError::UserNotFound { .. })
        ));
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut s = storage();
        s.register_user("alice", "s3cret").unwrap();
        assert!(matches!(
            s.register_user("alice", "other1"),
            Err(TrackerError::DuplicateUser { ref id }) if id == "alice"
        ));
    }

    #[test]
    fn invalid_registration_is_rejected() {
        let mut s = storage();
        assert!(matches!(
            s.register_user("al", "s3cret"),
            Err(TrackerError::Validation { ref field, .. }) if field == "user_id"
        ));
        assert!(!s.user_exists("al").unwrap());
    }

    #[test]
    fn lookups() {
        let mut s = storage();
        s.register_user("carol", "pw1234").unwrap();
        s.register_user("alice", "pw1234").unwrap();

        assert!(s.user_exists("alice").unwrap());
        assert!(!s.user_exists("bob1").unwrap());
        assert_eq!(s.list_user_ids().unwrap(), vec!["alice", "carol"]);

        let found = s
            .find_users(&["carol".to_string(), "zed12".to_string()])
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].user_id, "carol");
        assert!(s.find_users(&[]).unwrap().is_empty());
    }

    #[test]
    fn session_lifecycle() {
        let mut s = storage();
        s.register_user("alice", "s3cret").unwrap();

        let session = s.create_session("alice", Duration::minutes(30)).unwrap();
        assert_eq!(s.resolve_session(&session.token).unwrap(), "alice");

        assert!(s.delete_session(&session.token).unwrap());
        assert!(!s.delete_session(&session.token).unwrap());
        assert!(matches!(
            s.resolve_session(&session.token),
            Err(TrackerError::Unauthenticated)
        ));
    }

    #[test]
    fn expired_session_is_rejected() {
        let mut s = storage();
        s.register_user("alice", "s3cret").unwrap();
        let session = s.create_session("alice", Duration::seconds(-1)).unwrap();
        assert!(matches!(
            s.resolve_session(&session.token),
            Err(TrackerError::Unauthenticated)
        ));
    }

    #[test]
    fn session_for_unknown_user_fails() {
        let mut s = storage();
        assert!(matches!(
            s.create_session("ghost", Duration::minutes(5)),
            Err(TrackerError::UserNotFound { .. })
        ));
    }
}
