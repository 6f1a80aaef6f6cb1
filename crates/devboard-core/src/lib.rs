//! Selection-and-consistency engine for the device monitoring dashboard.
//!
//! This crate owns the client-side state of the dashboard and keeps it
//! consistent while the topology feed pushes updates and the user acts:
//!
//! - **[`DashboardStore`]**: The explicit state object. Holds the current
//!   [`Topology`], one [`SelectionState`] per [`Mode`], the [`ViewFlags`],
//!   and a [`PersistenceGateway`]. Every mutation reconciles before it
//!   saves, so persisted state never references a missing device.
//!
//! - **Selection engine**: Online mode selects any number of devices in
//!   order; archive mode selects at most one. Camera sub-selections only
//!   exist for selected devices. Reconciliation after a topology change or
//!   a device removal purges stale ids in both modes independently.
//!
//! - **Derived views** ([`store::derived`]): Plain functions over the
//!   current state: the search-filtered group tree, the devices to show on
//!   the map, and the archive "disabled" flags.
//!
//! - **[`PersistenceGateway`]**: Best-effort JSON snapshot of the durable
//!   subset under one key of a [`StateStorage`] backend. Absence or
//!   corruption yields defaults; write failures are logged, never raised.
//!
//! - **[`FeedSubscription`]**: Background task delivering a topology
//!   snapshot after a short delay, then a periodic heartbeat. Cancellable;
//!   dropping it stops every timer.
//!
//! - **[`MapLoader`]**: Single-flight loader for the map widget script,
//!   isolated from the state engine.

pub mod config;
pub mod error;
pub mod feed;
pub mod map;
pub mod model;
pub mod persist;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{FeedConfig, MapConfig, StoreOptions};
pub use error::CoreError;
pub use feed::{
    FeedMessage, FeedStream, FeedSubscription, JsonFileSource, StaticSource, TopologySource,
};
pub use map::{HttpMapProvider, MapHandle, MapLoader, MapProvider};
pub use persist::{FileStorage, MemoryStorage, PersistenceGateway, StateStorage};
pub use store::{DashboardStore, FilteredGroup, FilteredTopology, Topology};
pub use stream::{DeviceFilter, StateChanges};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Device, DeviceGroup, DeviceId, GroupId, Mode, PersistedState, STORAGE_KEY, SelectionState,
    Selections, TopologySnapshot, ViewFlags,
};
