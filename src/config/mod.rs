//! Configuration management for `issue_tracker`.
//!
//! Layers, lowest to highest precedence:
//! 1. Built-in defaults
//! 2. User config (`~/.config/issues/config.yaml`)
//! 3. Project config (`.issues/config.yaml`)
//! 4. Environment (`ISSUES_<KEY>`)
//! 5. CLI flags
//!
//! Keys are normalised: case-insensitive, `_` and `-` interchangeable.

use crate::error::{Result, TrackerError};
use crate::logging::LogFormat;
use crate::storage::SqliteStorage;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Workspace directory name.
pub const TRACKER_DIR_NAME: &str = ".issues";
/// Default database file inside the workspace directory.
pub const DEFAULT_DB_FILENAME: &str = "issues.db";
/// Config file name, both per-project and per-user.
pub const CONFIG_FILENAME: &str = "config.yaml";

const ENV_PREFIX: &str = "ISSUES_";
const DIR_ENV: &str = "ISSUES_DIR";

pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_SESSION_TTL_SECS: i64 = 1800;

/// Discover the active `.issues` directory.
///
/// Honors `ISSUES_DIR` when set, otherwise walks up from `start` (or CWD).
///
/// # Errors
///
/// Returns `NotInitialized` if no directory is found.
pub fn discover_tracker_dir(start: Option<&Path>) -> Result<PathBuf> {
    let env_dir = env::var(DIR_ENV).ok().map(PathBuf::from);
    discover_tracker_dir_with_env(start, env_dir.as_deref())
}

fn discover_tracker_dir_with_env(
    start: Option<&Path>,
    env_override: Option<&Path>,
) -> Result<PathBuf> {
    if let Some(path) = env_override {
        if !path.as_os_str().is_empty() && path.is_dir() {
            return Ok(path.to_path_buf());
        }
    }

    let mut current = match start {
        Some(path) => path.to_path_buf(),
        None => env::current_dir()?,
    };

    loop {
        let candidate = current.join(TRACKER_DIR_NAME);
        if candidate.is_dir() {
            return Ok(candidate);
        }

        if !current.pop() {
            break;
        }
    }

    Err(TrackerError::NotInitialized)
}

/// One configuration layer: normalised key to raw string value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    pub values: HashMap<String, String>,
}

impl ConfigLayer {
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(normalize_key(key), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(&normalize_key(key))
            .map(String::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    /// Merge another layer on top of this one (higher precedence wins).
    pub fn merge_from(&mut self, other: &Self) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Merge multiple layers in precedence order (lowest to highest).
    #[must_use]
    pub fn merge_layers(layers: &[Self]) -> Self {
        let mut merged = Self::default();
        for layer in layers {
            merged.merge_from(layer);
        }
        merged
    }

    /// Build a layer from a YAML file path. Missing files return empty config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let value: serde_yaml::Value = serde_yaml::from_str(&contents)?;
        Ok(layer_from_yaml_value(&value))
    }

    /// Build a layer from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_vars(env::vars())
    }

    /// Build a layer from `ISSUES_*` pairs; other variables are ignored.
    #[must_use]
    pub fn from_env_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut layer = Self::default();
        for (key, value) in vars {
            let Some(stripped) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            // ISSUES_DIR selects the workspace; it is not a config key.
            if stripped == "DIR" {
                continue;
            }
            layer.set(stripped, value);
        }
        layer
    }
}

/// CLI overrides for config loading.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub db: Option<PathBuf>,
    pub actor: Option<String>,
    pub lock_timeout: Option<u64>,
}

impl CliOverrides {
    #[must_use]
    pub fn as_layer(&self) -> ConfigLayer {
        let mut layer = ConfigLayer::default();
        if let Some(path) = &self.db {
            layer.set("db", path.to_string_lossy());
        }
        if let Some(actor) = &self.actor {
            layer.set("actor", actor.clone());
        }
        if let Some(lock_timeout) = self.lock_timeout {
            layer.set("lock-timeout", lock_timeout.to_string());
        }
        layer
    }
}

/// Default config layer (lowest precedence).
#[must_use]
pub fn default_config_layer() -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    layer.set("lock-timeout", DEFAULT_LOCK_TIMEOUT_MS.to_string());
    layer.set("page-size", DEFAULT_PAGE_SIZE.to_string());
    layer.set("bind", DEFAULT_BIND);
    layer.set("session-ttl", DEFAULT_SESSION_TTL_SECS.to_string());
    layer.set("log-format", "text");
    layer
}

/// Load user config (`~/.config/issues/config.yaml`).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<ConfigLayer> {
    let Ok(home) = env::var("HOME") else {
        return Ok(ConfigLayer::default());
    };
    let path = Path::new(&home)
        .join(".config")
        .join("issues")
        .join(CONFIG_FILENAME);
    ConfigLayer::from_yaml(&path)
}

/// Load project config (`.issues/config.yaml`).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(tracker_dir: &Path) -> Result<ConfigLayer> {
    ConfigLayer::from_yaml(&tracker_dir.join(CONFIG_FILENAME))
}

/// Resolved, typed configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// The discovered `.issues` directory, if any.
    pub tracker_dir: Option<PathBuf>,
    /// Explicit database path (`db` key); otherwise `<tracker_dir>/issues.db`.
    pub db: Option<PathBuf>,
    pub actor: Option<String>,
    pub lock_timeout_ms: u64,
    pub page_size: i64,
    pub bind: String,
    pub session_ttl_secs: i64,
    pub log_format: LogFormat,
}

impl Config {
    /// Interpret a merged layer.
    ///
    /// # Errors
    ///
    /// `Config` if a numeric or enumerated key holds an invalid value.
    pub fn from_layer(layer: &ConfigLayer, tracker_dir: Option<PathBuf>) -> Result<Self> {
        let page_size: i64 = parse_key(layer, "page-size", DEFAULT_PAGE_SIZE)?;
        if page_size < 1 {
            return Err(TrackerError::Config(
                "page-size must be at least 1".to_string(),
            ));
        }
        let session_ttl_secs: i64 = parse_key(layer, "session-ttl", DEFAULT_SESSION_TTL_SECS)?;
        if session_ttl_secs < 1 {
            return Err(TrackerError::Config(
                "session-ttl must be at least 1 second".to_string(),
            ));
        }
        let log_format = match layer.get("log-format") {
            Some(value) => value
                .parse::<LogFormat>()
                .map_err(|_| TrackerError::Config(format!("invalid log-format '{value}'")))?,
            None => LogFormat::Text,
        };

        Ok(Self {
            tracker_dir,
            db: layer.get("db").map(PathBuf::from),
            actor: layer.get("actor").map(ToString::to_string),
            lock_timeout_ms: parse_key(layer, "lock-timeout", DEFAULT_LOCK_TIMEOUT_MS)?,
            page_size,
            bind: layer.get("bind").unwrap_or(DEFAULT_BIND).to_string(),
            session_ttl_secs,
            log_format,
        })
    }

    /// Database path: explicit `db`, else inside the workspace directory.
    ///
    /// # Errors
    ///
    /// `NotInitialized` when neither is available.
    pub fn db_path(&self) -> Result<PathBuf> {
        if let Some(db) = &self.db {
            return Ok(db.clone());
        }
        self.tracker_dir
            .as_ref()
            .map(|dir| dir.join(DEFAULT_DB_FILENAME))
            .ok_or(TrackerError::NotInitialized)
    }

    /// The identity mutating CLI commands act as.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` if no actor is configured.
    pub fn require_actor(&self) -> Result<&str> {
        self.actor.as_deref().ok_or(TrackerError::Unauthenticated)
    }
}

fn parse_key<T: std::str::FromStr>(layer: &ConfigLayer, key: &str, default: T) -> Result<T> {
    match layer.get(key) {
        Some(value) => value
            .parse::<T>()
            .map_err(|_| TrackerError::Config(format!("invalid value for {key}: '{value}'"))),
        None => Ok(default),
    }
}

/// Load configuration with the full precedence order.
///
/// A missing workspace directory is not an error here; commands that need
/// the database fail later with `NotInitialized`.
///
/// # Errors
///
/// Returns an error if a config file cannot be read or parsed, or a value is invalid.
pub fn load_config(cli: &CliOverrides) -> Result<Config> {
    let tracker_dir = match discover_tracker_dir(None) {
        Ok(dir) => Some(dir),
        Err(TrackerError::NotInitialized) => None,
        Err(e) => return Err(e),
    };
    load_config_from(tracker_dir, load_user_config()?, ConfigLayer::from_env(), cli)
}

/// Load configuration from explicit layers.
///
/// # Errors
///
/// Returns an error if the project config cannot be read or a value is invalid.
pub fn load_config_from(
    tracker_dir: Option<PathBuf>,
    user: ConfigLayer,
    env_layer: ConfigLayer,
    cli: &CliOverrides,
) -> Result<Config> {
    let project = match &tracker_dir {
        Some(dir) => load_project_config(dir)?,
        None => ConfigLayer::default(),
    };
    let merged = ConfigLayer::merge_layers(&[
        default_config_layer(),
        user,
        project,
        env_layer,
        cli.as_layer(),
    ]);
    Config::from_layer(&merged, tracker_dir)
}

/// Open storage using resolved config, returning the storage and the config used.
///
/// # Errors
///
/// Returns an error if config loading fails, no workspace exists, or the
/// database cannot be opened.
pub fn open_storage(cli: &CliOverrides) -> Result<(SqliteStorage, Config)> {
    let config = load_config(cli)?;
    let db_path = config.db_path()?;
    if config.db.is_none() && !db_path.exists() {
        return Err(TrackerError::NotInitialized);
    }
    let storage = SqliteStorage::open_with_timeout(&db_path, Some(config.lock_timeout_ms))?;
    Ok((storage, config))
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace('_', "-")
}

fn layer_from_yaml_value(value: &serde_yaml::Value) -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    let mut flat = HashMap::new();
    flatten_yaml(value, "", &mut flat);

    for (key, value) in flat {
        layer.set(&key, value);
    }

    layer
}

fn flatten_yaml(value: &serde_yaml::Value, prefix: &str, out: &mut HashMap<String, String>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (key, value) in map {
                let Some(key_str) = key.as_str() else {
                    continue;
                };
                let next_prefix = if prefix.is_empty() {
                    key_str.to_string()
                } else {
                    format!("{prefix}.{key_str}")
                };
                flatten_yaml(value, &next_prefix, out);
            }
        }
        _ => {
            if let Some(value) = yaml_scalar_to_string(value) {
                out.insert(prefix.to_string(), value);
            }
        }
    }
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Bool(v) => Some(v.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Null
        | serde_yaml::Value::Sequence(_)
        | serde_yaml::Value::Mapping(_) => None,
        serde_yaml::Value::Tagged(tagged) => yaml_scalar_to_string(&tagged.value),
    }
}
