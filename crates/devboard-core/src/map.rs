// ── Map widget loader ──
//
// Capability for loading the third-party map script. Kept apart from the
// state engine: nothing in `store` depends on it.
//
// At most one request is ever started per loader. Every caller, concurrent
// or later, awaits the same shared future and sees the same outcome,
// including a failure. A missing API key is the exception: it is reported
// on every call and never cached.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use secrecy::ExposeSecret;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::MapConfig;
use crate::error::CoreError;

/// A successfully loaded map widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapHandle {
    /// Script URL with the API key stripped.
    pub api_url: Url,
    pub loaded_at: DateTime<Utc>,
}

/// Fetches the map script.
pub trait MapProvider: Send + Sync {
    fn fetch(&self, script_url: Url) -> BoxFuture<'static, Result<MapHandle, CoreError>>;
}

// ── HTTP provider ───────────────────────────────────────────────────

/// Loads the script over HTTP and treats any success status as ready.
#[derive(Debug, Clone, Default)]
pub struct HttpMapProvider {
    client: reqwest::Client,
}

impl HttpMapProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl MapProvider for HttpMapProvider {
    fn fetch(&self, script_url: Url) -> BoxFuture<'static, Result<MapHandle, CoreError>> {
        let client = self.client.clone();
        async move {
            // Errors carry the URL, which carries the key.
            let response = client
                .get(script_url.clone())
                .send()
                .await
                .map_err(|e| CoreError::MapUnavailable {
                    reason: e.without_url().to_string(),
                })?;

            let status = response.status();
            if !status.is_success() {
                return Err(CoreError::MapUnavailable {
                    reason: format!("map script request returned {status}"),
                });
            }

            Ok(MapHandle {
                api_url: redact_key(&script_url),
                loaded_at: Utc::now(),
            })
        }
        .boxed()
    }
}

// ── Loader ──────────────────────────────────────────────────────────

type SharedLoad = Shared<BoxFuture<'static, Result<MapHandle, CoreError>>>;

/// Single-flight, result-caching map loader.
pub struct MapLoader {
    config: MapConfig,
    provider: Arc<dyn MapProvider>,
    in_flight: Mutex<Option<SharedLoad>>,
}

impl MapLoader {
    pub fn new(config: MapConfig, provider: Arc<dyn MapProvider>) -> Self {
        Self {
            config,
            provider,
            in_flight: Mutex::new(None),
        }
    }

    /// Loader backed by [`HttpMapProvider`].
    pub fn http(config: MapConfig) -> Self {
        Self::new(config, Arc::new(HttpMapProvider::new()))
    }

    /// Load the widget, or join the load already started.
    pub async fn load(&self) -> Result<MapHandle, CoreError> {
        let pending = self.pending()?;
        let result = pending.await;
        if let Err(ref e) = result {
            warn!(error = %e, "map widget failed to load");
        }
        result
    }

    /// `true` once a request has been started (and cached).
    pub fn is_started(&self) -> bool {
        self.in_flight.lock().is_ok_and(|slot| slot.is_some())
    }

    fn pending(&self) -> Result<SharedLoad, CoreError> {
        let Some(api_key) = self.config.api_key.as_ref() else {
            return Err(CoreError::MissingApiKey {
                variable: self.config.api_key_env.clone(),
            });
        };

        let mut slot = self
            .in_flight
            .lock()
            .map_err(|_| CoreError::Internal("map loader lock poisoned".into()))?;

        if let Some(existing) = slot.as_ref() {
            debug!("joining existing map load");
            return Ok(existing.clone());
        }

        let mut script_url = Url::parse(&self.config.api_url).map_err(|e| CoreError::Config {
            message: format!("invalid map API URL '{}': {e}", self.config.api_url),
        })?;
        script_url
            .query_pairs_mut()
            .append_pair("apikey", api_key.expose_secret());

        info!(url = %redact_key(&script_url), "loading map widget");
        let load = self.provider.fetch(script_url).shared();
        *slot = Some(load.clone());
        Ok(load)
    }
}

/// Drop the `apikey` query parameter.
fn redact_key(url: &Url) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "apikey")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut clean = url.clone();
    if kept.is_empty() {
        clean.set_query(None);
    } else {
        clean.query_pairs_mut().clear().extend_pairs(kept);
    }
    clean
}
