// ── Persistence gateway ──
//
// Best-effort load/save of the durable state under a single key. Nothing
// here ever fails outward: a missing or unreadable value means "no prior
// state", a failed write is logged and dropped.

mod storage;

use tracing::{debug, warn};

pub use storage::{FileStorage, MemoryStorage, StateStorage};

use crate::model::{PersistedState, STORAGE_KEY};

/// Reads and writes [`PersistedState`] through a [`StateStorage`] backend.
pub struct PersistenceGateway {
    storage: Box<dyn StateStorage>,
    key: String,
}

impl PersistenceGateway {
    pub fn new(storage: impl StateStorage + 'static) -> Self {
        Self::from_boxed(Box::new(storage))
    }

    pub fn from_boxed(storage: Box<dyn StateStorage>) -> Self {
        Self {
            storage,
            key: STORAGE_KEY.to_owned(),
        }
    }

    /// A gateway that forgets everything when the process exits.
    pub fn ephemeral() -> Self {
        Self::new(MemoryStorage::new())
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn backend(&self) -> &str {
        self.storage.name()
    }

    /// Load the stored state, normalized. `None` on absence or any failure.
    pub fn load(&self) -> Option<PersistedState> {
        let raw = match self.storage.get(&self.key) {
            Ok(Some(raw)) if !raw.trim().is_empty() => raw,
            Ok(_) => {
                debug!(key = %self.key, "no persisted dashboard state");
                return None;
            }
            Err(e) => {
                warn!(error = %e, key = %self.key, "failed to read persisted state");
                return None;
            }
        };

        match serde_json::from_str::<PersistedState>(&raw) {
            Ok(state) => {
                debug!(key = %self.key, mode = %state.mode, "restored dashboard state");
                Some(state.normalized())
            }
            Err(e) => {
                warn!(error = %e, key = %self.key, "discarding malformed persisted state");
                None
            }
        }
    }

    /// Write `state`. Failures are logged, never returned.
    pub fn save(&self, state: &PersistedState) {
        let raw = match serde_json::to_string(state) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "failed to serialize dashboard state");
                return;
            }
        };

        if let Err(e) = self.storage.set(&self.key, &raw) {
            warn!(error = %e, key = %self.key, "failed to persist dashboard state");
        }
    }

    /// Wait for writes the backend has deferred. Failures are logged, never
    /// returned. Also runs on drop.
    pub fn flush(&self) {
        if let Err(e) = self.storage.flush() {
            warn!(error = %e, key = %self.key, "failed to flush persisted state");
        }
    }

    /// Remove the stored state. Failures are logged, never returned.
    pub fn clear(&self) {
        if let Err(e) = self.storage.remove(&self.key) {
            warn!(error = %e, key = %self.key, "failed to clear persisted state");
        }
    }
}

impl Drop for PersistenceGateway {
    fn drop(&mut self) {
        self.flush();
    }
}

impl Default for PersistenceGateway {
    fn default() -> Self {
        Self::ephemeral()
    }
}

impl std::fmt::Debug for PersistenceGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceGateway")
            .field("backend", &self.storage.name())
            .field("key", &self.key)
            .finish()
    }
}
