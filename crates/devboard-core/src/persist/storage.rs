// ── Key/value storage backends ──
//
// The persistence gateway only needs "read a string by key" and "write a
// string by key". Backends report failures; the gateway decides what to
// do with them.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use tracing::warn;

use crate::error::CoreError;

/// A string key/value store.
pub trait StateStorage: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Read the value under `key`. A missing key is `Ok(None)`, not an error.
    fn get(&self, key: &str) -> Result<Option<String>, CoreError>;

    /// Replace the value under `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), CoreError>;

    /// Delete the value under `key`. Deleting a missing key succeeds.
    fn remove(&self, key: &str) -> Result<(), CoreError>;

    /// Block until every accepted `set` is durable.
    fn flush(&self) -> Result<(), CoreError> {
        Ok(())
    }
}

impl<T: StateStorage + ?Sized> StateStorage for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), CoreError> {
        (**self).remove(key)
    }

    fn flush(&self) -> Result<(), CoreError> {
        (**self).flush()
    }
}

// ── MemoryStorage ───────────────────────────────────────────────────

/// In-memory backend for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: DashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate one entry.
    pub fn with_entry(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl StateStorage for MemoryStorage {
    fn name(&self) -> &str {
        "memory"
    }

    fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CoreError> {
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

// ── FileStorage ─────────────────────────────────────────────────────

/// One file per key under a directory.
///
/// Writes go to a sibling temp file first and are renamed into place, so
/// an interrupted write never leaves a truncated value behind.
///
/// Inside a tokio runtime `set` only records the value and hands the disk
/// work to the blocking pool; outside one it writes inline. Reads see the
/// latest recorded value either way. Queued writes for one key coalesce:
/// each write task stores whatever value is newest when it runs, so an
/// older value never lands after a newer one.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
    pending: Arc<DashMap<String, (u64, String)>>,
    generation: Arc<AtomicU64>,
    disk: Arc<Mutex<()>>,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            pending: Arc::new(DashMap::new()),
            generation: Arc::new(AtomicU64::new(0)),
            disk: Arc::new(Mutex::new(())),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path backing `key`. Characters outside `[A-Za-z0-9._-]` become `_`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{file}.json"))
    }

    /// Number of values recorded but not yet on disk.
    pub fn pending_writes(&self) -> usize {
        self.pending.len()
    }

    /// Write the newest pending value of `key`, if any.
    fn write_pending(&self, key: &str) -> Result<(), CoreError> {
        let _disk = self
            .disk
            .lock()
            .map_err(|_| CoreError::storage(self.name(), "write lock poisoned"))?;

        let newest = self.pending.get(key).map(|entry| entry.value().clone());
        let Some((generation, value)) = newest else {
            return Ok(());
        };

        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::create_dir_all(&self.dir).map_err(|e| CoreError::storage(self.name(), e))?;
        fs::write(&tmp, value).map_err(|e| CoreError::storage(self.name(), e))?;
        fs::rename(&tmp, &path).map_err(|e| CoreError::storage(self.name(), e))?;

        self.pending.remove_if(key, |_, (g, _)| *g == generation);
        Ok(())
    }
}

impl StateStorage for FileStorage {
    fn name(&self) -> &str {
        "file"
    }

    fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        if let Some(entry) = self.pending.get(key) {
            return Ok(Some(entry.value().1.clone()));
        }
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CoreError::storage(self.name(), e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CoreError> {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        self.pending.insert(key.to_owned(), (generation, value.to_owned()));

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return self.write_pending(key);
        };

        let this = self.clone();
        let key = key.to_owned();
        runtime.spawn_blocking(move || {
            if let Err(e) = this.write_pending(&key) {
                warn!(error = %e, key = %key, "background state write failed");
            }
        });
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CoreError> {
        let _disk = self
            .disk
            .lock()
            .map_err(|_| CoreError::storage(self.name(), "write lock poisoned"))?;
        self.pending.remove(key);

        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CoreError::storage(self.name(), e)),
        }
    }

    fn flush(&self) -> Result<(), CoreError> {
        let keys: Vec<String> = self.pending.iter().map(|entry| entry.key().clone()).collect();
        for key in keys {
            self.write_pending(&key)?;
        }
        Ok(())
    }
}
