//! Shared configuration for solfin front ends.
//!
//! TOML file + `SOLFIN_` environment overrides, platform paths, the
//! session storage backend, and translation to
//! `solfin_core::ClientConfig`.

mod storage;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use solfin_core::{
    ClientConfig, FileStorage, MemoryStorage, NotificationConfig, Position, SessionStorage,
};

pub use storage::KeyringStorage;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring unavailable: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub notifications: NotificationSettings,

    #[serde(default)]
    pub session: SessionSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Upper bound on one credential refresh.
    #[serde(default = "default_refresh_timeout")]
    pub refresh_timeout_secs: u64,

    pub user_agent: Option<String>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            refresh_timeout_secs: default_refresh_timeout(),
            user_agent: None,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000/api".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_refresh_timeout() -> u64 {
    15
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NotificationSettings {
    #[serde(default = "default_max_visible")]
    pub max_visible: usize,
    #[serde(default = "default_exit_delay")]
    pub exit_delay_ms: u64,
    #[serde(default = "default_success_ms")]
    pub success_ms: u64,
    #[serde(default = "default_error_ms")]
    pub error_ms: u64,
    #[serde(default = "default_warning_ms")]
    pub warning_ms: u64,
    #[serde(default = "default_info_ms")]
    pub info_ms: u64,
    #[serde(default)]
    pub position: Position,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            max_visible: default_max_visible(),
            exit_delay_ms: default_exit_delay(),
            success_ms: default_success_ms(),
            error_ms: default_error_ms(),
            warning_ms: default_warning_ms(),
            info_ms: default_info_ms(),
            position: Position::default(),
        }
    }
}

fn default_max_visible() -> usize {
    5
}
fn default_exit_delay() -> u64 {
    300
}
fn default_success_ms() -> u64 {
    3000
}
fn default_error_ms() -> u64 {
    5000
}
fn default_warning_ms() -> u64 {
    4000
}
fn default_info_ms() -> u64 {
    3000
}

/// Where the signed-in session survives between runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    #[default]
    File,
    Keyring,
    /// Forget the session when the process exits.
    Memory,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SessionSettings {
    #[serde(default)]
    pub backend: SessionBackend,

    /// Session file for the `file` backend. Defaults to `session.json`
    /// in the platform data directory.
    pub path: Option<PathBuf>,
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "solfin", "solfin")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

pub fn data_dir() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(".local/share"),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

fn home_fallback(sub: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(sub);
    p.push("solfin");
    p
}

// ── Loading & saving ────────────────────────────────────────────────

/// Load from the canonical path plus environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Defaults, then `path` (if it exists), then `SOLFIN_*` variables with
/// `__` separating sections (`SOLFIN_API__BASE_URL`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("SOLFIN_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

impl Config {
    pub fn to_client_config(&self) -> Result<ClientConfig, ConfigError> {
        let base_url: url::Url =
            self.api
                .base_url
                .parse()
                .map_err(|e: url::ParseError| ConfigError::Validation {
                    field: "api.base_url".into(),
                    reason: format!("{e}: {}", self.api.base_url),
                })?;
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::Validation {
                field: "api.timeout_secs".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.notifications.max_visible == 0 {
            return Err(ConfigError::Validation {
                field: "notifications.max_visible".into(),
                reason: "must be at least 1".into(),
            });
        }

        let n = &self.notifications;
        let mut client = ClientConfig::new(base_url);
        client.timeout = Duration::from_secs(self.api.timeout_secs);
        client.refresh_timeout = Duration::from_secs(self.api.refresh_timeout_secs);
        client.user_agent.clone_from(&self.api.user_agent);
        client.notifications = NotificationConfig {
            max_visible: n.max_visible,
            exit_delay: Duration::from_millis(n.exit_delay_ms),
            default_position: n.position,
            success_duration: Duration::from_millis(n.success_ms),
            error_duration: Duration::from_millis(n.error_ms),
            warning_duration: Duration::from_millis(n.warning_ms),
            info_duration: Duration::from_millis(n.info_ms),
        };
        Ok(client)
    }

    pub fn session_path(&self) -> PathBuf {
        self.session
            .path
            .clone()
            .unwrap_or_else(|| data_dir().join("session.json"))
    }

    /// Open the configured session backend.
    pub fn session_storage(&self) -> Result<Arc<dyn SessionStorage>, ConfigError> {
        Ok(match self.session.backend {
            SessionBackend::File => Arc::new(FileStorage::new(self.session_path())),
            SessionBackend::Keyring => Arc::new(KeyringStorage::new()?),
            SessionBackend::Memory => Arc::new(MemoryStorage::new()),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_translate_to_client_defaults() {
        let client = Config::default().to_client_config().unwrap();
        assert_eq!(client.timeout, Duration::from_secs(30));
        assert_eq!(client.refresh_timeout, Duration::from_secs(15));
        assert_eq!(client.notifications, NotificationConfig::default());
    }

    #[test]
    fn bad_base_url_names_the_field() {
        let mut cfg = Config::default();
        cfg.api.base_url = "not a url".into();
        let err = cfg.to_client_config().unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "api.base_url"));
    }

    #[test]
    fn zero_max_visible_is_rejected() {
        let mut cfg = Config::default();
        cfg.notifications.max_visible = 0;
        assert!(cfg.to_client_config().is_err());
    }

    #[test]
    fn explicit_session_path_wins() {
        let mut cfg = Config::default();
        cfg.session.path = Some(PathBuf::from("/tmp/solfin-session.json"));
        assert_eq!(
            cfg.session_path(),
            PathBuf::from("/tmp/solfin-session.json")
        );
    }
}
