//! HTTP API over the tracker.
//!
//! Handlers hold no shared mutable state. Each request opens its own `SQLite`
//! connection on a blocking thread, and every mutation is one transaction,
//! so concurrent requests are serialized by the database alone.

pub mod auth;
mod error;
mod extract;
mod handlers;

pub use auth::{CurrentUser, SESSION_COOKIE, session_token};
pub use error::ApiError;
pub use extract::{ApiJson, ApiPath, ApiQuery};

use crate::config::Config;
use crate::error::Result;
use crate::storage::SqliteStorage;
use axum::Router;
use axum::routing::{delete, get, patch, post, put};
use std::path::PathBuf;
use std::sync::Arc;

/// Immutable settings shared by all requests.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub db_path: PathBuf,
    pub lock_timeout_ms: u64,
    pub session_ttl: chrono::Duration,
}

impl ServerSettings {
    /// # Errors
    ///
    /// `NotInitialized` if no database location is configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            db_path: config.db_path()?,
            lock_timeout_ms: config.lock_timeout_ms,
            session_ttl: chrono::Duration::seconds(config.session_ttl_secs),
        })
    }
}

pub type AppState = Arc<ServerSettings>;

/// Run `f` against a fresh connection on the blocking pool.
///
/// The schema is applied once by [`serve`]; request connections skip it.
///
/// # Errors
///
/// Whatever `f` returns, or an internal error if the task panics.
pub async fn with_storage<F, T>(state: &AppState, f: F) -> std::result::Result<T, ApiError>
where
    F: FnOnce(&mut SqliteStorage) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let settings = Arc::clone(state);
    let result = tokio::task::spawn_blocking(move || {
        let mut storage =
            SqliteStorage::open_existing(&settings.db_path, Some(settings.lock_timeout_ms))?;
        f(&mut storage)
    })
    .await?;
    Ok(result?)
}

/// Like [`with_storage`], but first resolves the request's session on the
/// same connection and hands the user id to `f` as the actor.
///
/// # Errors
///
/// `Unauthenticated` for an unknown or expired session, otherwise whatever
/// `f` returns.
pub async fn with_actor<F, T>(
    state: &AppState,
    user: CurrentUser,
    f: F,
) -> std::result::Result<T, ApiError>
where
    F: FnOnce(&mut SqliteStorage, &str) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    with_storage(state, move |storage| {
        let actor = storage.resolve_session(&user.token)?;
        f(storage, &actor)
    })
    .await
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/users", get(handlers::list_users).post(handlers::register))
        .route("/users/:id/exists", get(handlers::user_exists))
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout))
        .route("/labels", get(handlers::list_labels).post(handlers::create_label))
        .route(
            "/labels/:id",
            get(handlers::get_label)
                .put(handlers::update_label)
                .delete(handlers::delete_label),
        )
        .route(
            "/milestones",
            get(handlers::list_milestones).post(handlers::create_milestone),
        )
        .route(
            "/milestones/:id",
            get(handlers::get_milestone)
                .put(handlers::update_milestone)
                .delete(handlers::delete_milestone),
        )
        .route("/milestones/:id/close", post(handlers::close_milestone))
        .route("/milestones/:id/reopen", post(handlers::reopen_milestone))
        .route(
            "/issues",
            get(handlers::filter_issues).post(handlers::create_issue),
        )
        .route(
            "/issues/open",
            get(handlers::list_open).post(handlers::bulk_open),
        )
        .route(
            "/issues/closed",
            get(handlers::list_closed),
        )
        .route("/issues/close", post(handlers::bulk_close))
        .route("/issues/:id", get(handlers::get_issue))
        .route("/issues/:id/title", patch(handlers::update_title))
        .route("/issues/:id/labels", put(handlers::set_labels))
        .route(
            "/issues/:id/labels/:label_id",
            post(handlers::add_label).delete(handlers::remove_label),
        )
        .route("/issues/:id/assignees", put(handlers::set_assignees))
        .route("/issues/:id/milestone", put(handlers::reassign_milestone))
        .route("/issues/:id/close", post(handlers::close_issue))
        .route("/issues/:id/open", post(handlers::open_issue))
        .route("/issues/:id/events", get(handlers::issue_events))
        .route(
            "/issues/:id/comments",
            get(handlers::list_comments).post(handlers::add_comment),
        )
        .route("/comments/:id", patch(handlers::edit_comment))
        .route("/filters", get(handlers::filter_summary))
        .route(
            "/filters/saved",
            get(handlers::list_saved_filters).post(handlers::save_filter),
        )
        .route("/filters/saved/:id", delete(handlers::delete_saved_filter))
        .route(
            "/filters/saved/:id/issues",
            get(handlers::apply_saved_filter),
        )
        .with_state(state)
}

/// Serve until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(settings: ServerSettings, bind: &str) -> Result<()> {
    // Fail fast on a missing or unreadable database.
    SqliteStorage::open_with_timeout(&settings.db_path, Some(settings.lock_timeout_ms))?;

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        db = %settings.db_path.display(),
        "Serving issue tracker API"
    );

    axum::serve(listener, router(Arc::new(settings)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrackerError;
    use tempfile::TempDir;

    fn state_for(dir: &TempDir) -> AppState {
        Arc::new(ServerSettings {
            db_path: dir.path().join("issues.db"),
            lock_timeout_ms: 1_000,
            session_ttl: chrono::Duration::minutes(5),
        })
    }

    #[tokio::test]
    async fn actor_resolves_on_the_request_connection() {
        let dir = TempDir::new().unwrap();
        let state = state_for(&dir);
        let token = {
            let mut storage = SqliteStorage::open(&state.db_path).unwrap();
            storage.register_user("alice", "secret1").unwrap();
            storage
                .create_session("alice", chrono::Duration::minutes(5))
                .unwrap()
                .token
        };

        let actor = with_actor(&state, CurrentUser { token }, |_, actor| {
            Ok(actor.to_string())
        })
        .await
        .unwrap();
        assert_eq!(actor, "alice");

        let forged = CurrentUser {
            token: "forged".to_string(),
        };
        let err = with_actor(&state, forged, |_, _| Ok(())).await.unwrap_err();
        assert!(matches!(err.0, TrackerError::Unauthenticated));
    }

    #[tokio::test]
    async fn request_connections_never_create_the_database() {
        let dir = TempDir::new().unwrap();
        let state = state_for(&dir);
        let result = with_storage(&state, |s| s.list_user_ids()).await;
        assert!(result.is_err());
        assert!(!state.db_path.exists());
    }
}
