// ── Core error types ──
//
// Errors from devboard-core. Only configuration absence reaches the caller
// of an operation; storage failures are swallowed by the persistence
// gateway and referential inconsistencies are repaired by reconciliation.

use thiserror::Error;

/// Unified error type for the core crate.
///
/// `Clone` so a settled map load can be handed to every waiting caller.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Storage errors ───────────────────────────────────────────────
    #[error("Storage error ({backend}): {message}")]
    Storage { backend: String, message: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Malformed payload: {message}")]
    Payload { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Map API key is not configured (set {variable})")]
    MissingApiKey { variable: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Collaborator errors ──────────────────────────────────────────
    #[error("Map widget unavailable: {reason}")]
    MapUnavailable { reason: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn storage(backend: &str, err: impl std::fmt::Display) -> Self {
        Self::Storage {
            backend: backend.to_owned(),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Payload {
            message: err.to_string(),
        }
    }
}
