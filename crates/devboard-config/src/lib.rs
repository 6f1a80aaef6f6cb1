//! Configuration for the device dashboard.
//!
//! TOML file plus `DEVBOARD_*` environment overrides, map API key
//! resolution (env var, then keyring, then plaintext), and translation to
//! the runtime types of `devboard_core`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use devboard_core::config::{DEFAULT_MAP_API_KEY_ENV, DEFAULT_MAP_API_URL};
use devboard_core::{
    FeedConfig, FileStorage, JsonFileSource, MapConfig, MemoryStorage, PersistenceGateway,
    STORAGE_KEY, StateStorage, StoreOptions, TopologySource,
};

const KEYRING_SERVICE: &str = "devboard";
const KEYRING_MAP_KEY: &str = "map/api-key";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no map API key: set {variable}, store one in the keyring, or set map.api_key")]
    NoCredentials { variable: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub feed: FeedSettings,

    #[serde(default)]
    pub map: MapSettings,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    /// One JSON file per key under `path`.
    #[default]
    File,
    /// Process-lifetime only.
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StorageSettings {
    #[serde(default)]
    pub backend: StorageBackendKind,

    /// Directory for the file backend. Defaults to the platform data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    #[serde(default = "default_storage_key")]
    pub key: String,

    #[serde(default)]
    pub purge_collapse_on_remove: bool,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackendKind::default(),
            path: None,
            key: default_storage_key(),
            purge_collapse_on_remove: false,
        }
    }
}

fn default_storage_key() -> String {
    STORAGE_KEY.into()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FeedSettings {
    /// Humantime duration, e.g. "600ms".
    #[serde(default = "default_initial_delay")]
    pub initial_delay: String,

    /// Humantime duration; "0s" disables the heartbeat.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval: String,

    /// JSON topology snapshot served by the feed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixture: Option<PathBuf>,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            initial_delay: default_initial_delay(),
            heartbeat_interval: default_heartbeat_interval(),
            fixture: None,
        }
    }
}

fn default_initial_delay() -> String {
    "600ms".into()
}
fn default_heartbeat_interval() -> String {
    "15s".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MapSettings {
    #[serde(default = "default_map_api_url")]
    pub api_url: String,

    /// API key in plaintext. Prefer the keyring or the env var.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    #[serde(default = "default_map_api_key_env")]
    pub api_key_env: String,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            api_url: default_map_api_url(),
            api_key: None,
            api_key_env: default_map_api_key_env(),
        }
    }
}

fn default_map_api_url() -> String {
    DEFAULT_MAP_API_URL.into()
}
fn default_map_api_key_env() -> String {
    DEFAULT_MAP_API_KEY_ENV.into()
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "devboard", "devboard")
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("devboard");
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default directory of the file storage backend.
pub fn data_dir() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("state"),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` (missing file is fine) + environment.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("DEVBOARD_").split("__"));

    let config: Config = figment.extract()?;
    debug!(path = %path.display(), backend = ?config.storage.backend, "config loaded");
    Ok(config)
}

/// Load config, falling back to defaults on any error.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_else(|e| {
        warn!(error = %e, "using default config");
        Config::default()
    })
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the map API key: env var, then system keyring, then plaintext.
pub fn resolve_map_api_key(map: &MapSettings) -> Result<SecretString, ConfigError> {
    resolve_map_api_key_with(map, keyring_map_key)
}

fn keyring_map_key() -> Option<String> {
    keyring::Entry::new(KEYRING_SERVICE, KEYRING_MAP_KEY)
        .and_then(|entry| entry.get_password())
        .ok()
}

fn resolve_map_api_key_with(
    map: &MapSettings,
    keyring_lookup: impl FnOnce() -> Option<String>,
) -> Result<SecretString, ConfigError> {
    // 1. Configured env var
    if let Ok(val) = std::env::var(&map.api_key_env) {
        if !val.trim().is_empty() {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Some(secret) = keyring_lookup() {
        return Ok(SecretString::from(secret));
    }

    // 3. Plaintext in config
    if let Some(ref key) = map.api_key {
        return Ok(SecretString::from(key.clone()));
    }

    Err(ConfigError::NoCredentials {
        variable: map.api_key_env.clone(),
    })
}

// ── Translation to runtime types ────────────────────────────────────

fn parse_duration(field: &str, raw: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(raw.trim()).map_err(|e| ConfigError::Validation {
        field: field.into(),
        reason: format!("'{raw}': {e}"),
    })
}

pub fn feed_config(cfg: &Config) -> Result<FeedConfig, ConfigError> {
    Ok(FeedConfig {
        initial_delay: parse_duration("feed.initial_delay", &cfg.feed.initial_delay)?,
        heartbeat_interval: parse_duration(
            "feed.heartbeat_interval",
            &cfg.feed.heartbeat_interval,
        )?,
    })
}

/// Map loader config. A missing key is not an error here: the loader
/// reports it on every load attempt instead.
pub fn map_config(cfg: &Config) -> MapConfig {
    let api_key = match resolve_map_api_key(&cfg.map) {
        Ok(key) => Some(key),
        Err(e) => {
            debug!(error = %e, "map API key not configured");
            None
        }
    };

    MapConfig {
        api_url: cfg.map.api_url.clone(),
        api_key,
        api_key_env: cfg.map.api_key_env.clone(),
    }
}

pub fn store_options(cfg: &Config) -> StoreOptions {
    StoreOptions {
        purge_collapse_on_remove: cfg.storage.purge_collapse_on_remove,
    }
}

/// Open the configured storage backend.
pub fn open_storage(cfg: &Config) -> Result<Box<dyn StateStorage>, ConfigError> {
    match cfg.storage.backend {
        StorageBackendKind::Memory => Ok(Box::new(MemoryStorage::new())),
        StorageBackendKind::File => {
            let dir = cfg.storage.path.clone().unwrap_or_else(data_dir);
            if dir.as_os_str().is_empty() {
                return Err(ConfigError::Validation {
                    field: "storage.path".into(),
                    reason: "must not be empty".into(),
                });
            }
            debug!(dir = %dir.display(), "file storage backend");
            Ok(Box::new(FileStorage::new(dir)))
        }
    }
}

/// Persistence gateway over the configured backend and key.
pub fn persistence(cfg: &Config) -> Result<PersistenceGateway, ConfigError> {
    if cfg.storage.key.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "storage.key".into(),
            reason: "must not be empty".into(),
        });
    }
    let storage = open_storage(cfg)?;
    Ok(PersistenceGateway::from_boxed(storage).with_key(cfg.storage.key.clone()))
}

/// Topology source for the feed, if a fixture is configured.
pub fn feed_source(cfg: &Config) -> Option<Arc<dyn TopologySource>> {
    cfg.feed
        .fixture
        .as_ref()
        .map(|path| Arc::new(JsonFileSource::new(path.clone())) as Arc<dyn TopologySource>)
}
