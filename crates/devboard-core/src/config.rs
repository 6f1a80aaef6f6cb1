// ── Runtime configuration ──
//
// These types describe how the store, the feed and the map loader behave.
// They never touch disk; `devboard-config` builds them from files and env.

use std::time::Duration;

use secrecy::SecretString;

/// Default script URL of the map widget.
pub const DEFAULT_MAP_API_URL: &str = "https://api-maps.yandex.ru/2.1/?lang=ru_RU";

/// Environment variable the map API key is conventionally read from.
pub const DEFAULT_MAP_API_KEY_ENV: &str = "DEVBOARD_MAP_API_KEY";

/// Timing of the topology feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// Delay before the first snapshot is delivered.
    pub initial_delay: Duration,
    /// Period of the liveness signal after the first snapshot. Zero disables it.
    pub heartbeat_interval: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(600),
            heartbeat_interval: Duration::from_secs(15),
        }
    }
}

/// Where and how to load the map widget.
#[derive(Debug, Clone)]
pub struct MapConfig {
    pub api_url: String,
    /// `None` makes every load fail with `CoreError::MissingApiKey`.
    pub api_key: Option<SecretString>,
    /// Named in the missing-key error so the operator knows what to set.
    pub api_key_env: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_MAP_API_URL.into(),
            api_key: None,
            api_key_env: DEFAULT_MAP_API_KEY_ENV.into(),
        }
    }
}

/// Store policy switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOptions {
    /// Drop a device's collapse flag when the device is removed.
    pub purge_collapse_on_remove: bool,
}
