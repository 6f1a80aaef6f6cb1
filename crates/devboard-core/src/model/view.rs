// ── Presentational view flags ──

use indexmap::IndexSet;

use super::entity_id::{DeviceId, GroupId};

/// Collapse flags and the search filter.
///
/// Collapse sets may name ids that no longer exist; they are cosmetic.
/// The search query is session-only and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewFlags {
    pub collapsed_groups: IndexSet<GroupId>,
    pub collapsed_devices: IndexSet<DeviceId>,
    pub search_query: String,
}
