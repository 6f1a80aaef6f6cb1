// ── Durable state ──
//
// The subset of dashboard state that survives a restart. Topology is
// never part of it; it always comes fresh from the feed.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use super::entity_id::{DeviceId, GroupId};
use super::selection::{Mode, Selections};

/// Storage key the dashboard state is written under.
pub const STORAGE_KEY: &str = "brn-device-dashboard";

/// Serialized form: `{ mode, collapsedGroups, collapsedDevices, selections }`.
///
/// Every field defaults on its own, so a payload missing one field still
/// restores the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedState {
    pub mode: Mode,
    pub collapsed_groups: IndexSet<GroupId>,
    pub collapsed_devices: IndexSet<DeviceId>,
    pub selections: Selections,
}

impl PersistedState {
    /// Repair what can be checked without a topology: at most one archive
    /// device, and camera buckets only for selected devices.
    pub fn normalized(mut self) -> Self {
        self.selections.normalize();
        self
    }
}
