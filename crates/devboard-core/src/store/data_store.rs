// ── Dashboard store ──
//
// The one explicit state object: topology, per-mode selections, view
// flags, and the gateway that persists them. Every mutation settles
// (reconciles) before it is saved, so storage never sees a state that
// violates the selection invariants.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::derived::{self, FilteredTopology};
use super::topology::Topology;
use crate::config::{FeedConfig, StoreOptions};
use crate::feed::{FeedMessage, FeedSubscription, TopologySource};
use crate::model::{
    Device, DeviceGroup, DeviceId, GroupId, Mode, PersistedState, SelectionState, Selections,
    TopologySnapshot, ViewFlags,
};
use crate::persist::PersistenceGateway;
use crate::stream::StateChanges;

/// Authoritative in-memory view of the dashboard.
///
/// Single owner, no interior locking: pass `&mut DashboardStore` to
/// whatever drives it (UI events, the feed pump).
pub struct DashboardStore {
    topology: Topology,
    selections: Selections,
    view: ViewFlags,
    mode: Mode,
    options: StoreOptions,
    persistence: PersistenceGateway,
    revision: watch::Sender<u64>,
    feed: Option<FeedSubscription>,
    feed_cancel: CancellationToken,
    last_snapshot_at: Option<DateTime<Utc>>,
    last_heartbeat_at: Option<DateTime<Utc>>,
}

impl DashboardStore {
    /// Load prior state through `persistence` (or start from defaults).
    pub fn new(persistence: PersistenceGateway) -> Self {
        Self::with_options(persistence, StoreOptions::default())
    }

    pub fn with_options(persistence: PersistenceGateway, options: StoreOptions) -> Self {
        let restored = persistence.load().unwrap_or_default();
        Self::from_persisted(restored, persistence, options)
    }

    /// Build a store from an explicit snapshot of durable state.
    pub fn from_persisted(
        state: PersistedState,
        persistence: PersistenceGateway,
        options: StoreOptions,
    ) -> Self {
        let PersistedState {
            mode,
            collapsed_groups,
            collapsed_devices,
            mut selections,
        } = state;
        selections.normalize();

        let (revision, _) = watch::channel(0u64);

        Self {
            topology: Topology::default(),
            selections,
            view: ViewFlags {
                collapsed_groups,
                collapsed_devices,
                search_query: String::new(),
            },
            mode,
            options,
            persistence,
            revision,
            feed: None,
            feed_cancel: CancellationToken::new(),
            last_snapshot_at: None,
            last_heartbeat_at: None,
        }
    }

    // ── Topology ingest ──────────────────────────────────────────────

    /// Replace the whole topology, reconcile both modes, then save.
    ///
    /// Idempotent: applying the same snapshot twice leaves the same state.
    pub fn replace_topology(&mut self, snapshot: TopologySnapshot) {
        self.topology.replace(snapshot);
        let dropped = self.selections.reconcile(&self.topology, None);
        self.last_snapshot_at = Some(Utc::now());

        info!(
            groups = self.topology.groups().len(),
            devices = self.topology.device_count(),
            ungrouped = self.topology.ungrouped_ids().len(),
            dropped,
            "topology replaced"
        );

        self.persist();
        self.bump();
    }

    /// Remove one device now, even if a later snapshot would keep it.
    /// Returns `false` (and does nothing) for an unknown id.
    pub fn remove_device(&mut self, id: DeviceId) -> bool {
        if self.topology.remove_device(id).is_none() {
            debug!(device_id = %id, "remove_device: unknown device");
            return false;
        }

        let dropped = self.selections.reconcile(&self.topology, Some(id));
        if self.options.purge_collapse_on_remove {
            self.view.forget_device(id);
        }
        debug!(device_id = %id, dropped, "device removed");

        self.persist();
        self.bump();
        true
    }

    // ── Selection engine ─────────────────────────────────────────────

    /// Switch the active mode. The other mode's selection is untouched.
    /// Returns `false` when `mode` was already active.
    pub fn set_mode(&mut self, mode: Mode) -> bool {
        if self.mode == mode {
            return false;
        }
        self.mode = mode;
        debug!(%mode, "mode switched");

        self.persist();
        self.bump();
        true
    }

    /// Toggle a device in the active mode. Returns `true` when selected.
    ///
    /// Once a topology is loaded, an id it does not contain is ignored:
    /// nothing changes, nothing is saved. Before the first snapshot there is
    /// nothing to check against, so any id is accepted and the first
    /// reconcile settles it.
    pub fn toggle_device_selection(&mut self, id: DeviceId) -> bool {
        if self.topology.is_loaded() && !self.topology.contains(id) {
            debug!(device_id = %id, "toggle_device_selection: unknown device");
            return false;
        }
        let selected = self.selections.toggle_device(self.mode, id);
        debug!(device_id = %id, mode = %self.mode, selected, "device selection toggled");

        self.persist();
        self.bump();
        selected
    }

    /// Toggle a camera of a device selected in the active mode.
    ///
    /// Returns `None` without saving when the device is not selected, or
    /// when the device is known and has no camera `camera`. Otherwise
    /// whether the camera ended up selected.
    pub fn toggle_camera(&mut self, id: DeviceId, camera: u32) -> Option<bool> {
        if let Some(device) = self.topology.device(id) {
            if !device.camera_indices().contains(&camera) {
                debug!(
                    device_id = %id,
                    camera,
                    cameras = device.camera_count,
                    "camera out of range"
                );
                return None;
            }
        }
        let selected = self.selections.toggle_camera(self.mode, id, camera)?;
        debug!(device_id = %id, camera, selected, "camera toggled");

        self.persist();
        self.bump();
        Some(selected)
    }

    // ── View state ───────────────────────────────────────────────────

    /// Returns `true` when the group is collapsed after the toggle.
    pub fn toggle_group_collapse(&mut self, id: &GroupId) -> bool {
        let collapsed = self.view.toggle_group(id);
        self.persist();
        self.bump();
        collapsed
    }

    /// Returns `true` when the device is collapsed after the toggle.
    pub fn toggle_device_collapse(&mut self, id: DeviceId) -> bool {
        let collapsed = self.view.toggle_device(id);
        self.persist();
        self.bump();
        collapsed
    }

    /// Replace the search filter. Session-only: not persisted.
    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.view.search_query = query.into();
        self.bump();
    }

    // ── Feed ─────────────────────────────────────────────────────────

    /// Attach a feed. Returns `false` if one is already attached.
    /// Must be called from within a tokio runtime.
    pub fn init_feed(&mut self, source: Arc<dyn TopologySource>, config: &FeedConfig) -> bool {
        if self.feed.is_some() {
            return false;
        }
        info!(source = source.name(), "attaching topology feed");
        self.feed = Some(FeedSubscription::connect(source, config, &self.feed_cancel));
        true
    }

    pub fn has_feed(&self) -> bool {
        self.feed.is_some()
    }

    /// Detach and stop the feed. No further snapshot or heartbeat arrives.
    pub fn dispose_feed(&mut self) {
        if let Some(mut feed) = self.feed.take() {
            feed.shutdown();
            info!("topology feed disposed");
        }
    }

    /// Apply one feed delivery.
    pub fn handle_feed_message(&mut self, message: FeedMessage) {
        match message {
            FeedMessage::Snapshot(snapshot) => self.replace_topology(snapshot),
            FeedMessage::Heartbeat => {
                debug!("feed heartbeat received");
                self.last_heartbeat_at = Some(Utc::now());
            }
        }
    }

    /// Receive and apply the next feed message.
    ///
    /// Returns `false` when no feed is attached or the feed has ended; an
    /// ended feed is detached.
    pub async fn pump_feed(&mut self) -> bool {
        let Some(feed) = self.feed.as_mut() else {
            return false;
        };
        let message = feed.recv().await;
        match message {
            Some(message) => {
                self.handle_feed_message(message);
                true
            }
            None => {
                debug!("topology feed ended");
                self.feed = None;
                false
            }
        }
    }

    /// Apply feed messages until `cancel` fires or the feed ends.
    pub async fn run_feed(&mut self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                more = self.pump_feed() => {
                    if !more {
                        break;
                    }
                }
            }
        }
    }

    pub fn last_snapshot_at(&self) -> Option<DateTime<Utc>> {
        self.last_snapshot_at
    }

    pub fn last_heartbeat_at(&self) -> Option<DateTime<Utc>> {
        self.last_heartbeat_at
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Selection of the active mode.
    pub fn current_selection(&self) -> &SelectionState {
        self.selections.get(self.mode)
    }

    pub fn selection(&self, mode: Mode) -> &SelectionState {
        self.selections.get(mode)
    }

    pub fn selections(&self) -> &Selections {
        &self.selections
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn groups(&self) -> &[DeviceGroup] {
        self.topology.groups()
    }

    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.topology.device(id)
    }

    pub fn ungrouped_ids(&self) -> &[DeviceId] {
        self.topology.ungrouped_ids()
    }

    /// `true` until the first snapshot has been applied.
    pub fn is_loading(&self) -> bool {
        !self.topology.is_loaded()
    }

    pub fn view_flags(&self) -> &ViewFlags {
        &self.view
    }

    pub fn search_query(&self) -> &str {
        &self.view.search_query
    }

    pub fn is_device_selected(&self, id: DeviceId) -> bool {
        self.current_selection().contains(id)
    }

    pub fn is_device_disabled(&self, id: DeviceId) -> bool {
        derived::is_device_disabled(&self.selections, self.mode, id)
    }

    pub fn is_group_collapsed(&self, id: &GroupId) -> bool {
        self.view.is_group_collapsed(id)
    }

    pub fn is_device_collapsed(&self, id: DeviceId) -> bool {
        self.view.is_device_collapsed(id)
    }

    /// Selected cameras of `id` in the active mode.
    pub fn cameras_for_device(&self, id: DeviceId) -> Vec<u32> {
        self.current_selection().cameras_for(id)
    }

    /// Topology filtered by the current search query.
    pub fn filtered_topology(&self) -> FilteredTopology<'_> {
        derived::filtered_topology(&self.topology, &self.view.search_query)
    }

    pub fn selected_devices_for_map(&self) -> Vec<&Device> {
        derived::selected_devices_for_map(&self.topology, &self.selections, self.mode)
    }

    /// The durable projection of the current state.
    pub fn persisted_state(&self) -> PersistedState {
        PersistedState {
            mode: self.mode,
            collapsed_groups: self.view.collapsed_groups.clone(),
            collapsed_devices: self.view.collapsed_devices.clone(),
            selections: self.selections.clone(),
        }
    }

    // ── Change notification ──────────────────────────────────────────

    pub fn subscribe(&self) -> StateChanges {
        StateChanges::new(self.revision.subscribe())
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn persist(&self) {
        self.persistence.save(&self.persisted_state());
    }

    fn bump(&self) {
        // `send_modify` updates unconditionally, even with zero receivers.
        self.revision.send_modify(|r| *r += 1);
    }
}

impl Default for DashboardStore {
    fn default() -> Self {
        Self::new(PersistenceGateway::ephemeral())
    }
}
