// ── Derived views ──
//
// Read-only projections over a state snapshot. Recomputed on every call;
// nothing here is cached or stored.

use super::topology::Topology;
use crate::model::{Device, DeviceGroup, DeviceId, Mode, Selections};
use crate::stream::DeviceFilter;

/// A group with the devices that passed the filter.
///
/// Groups are never filtered out, only their devices.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredGroup<'a> {
    pub group: &'a DeviceGroup,
    pub devices: Vec<&'a Device>,
}

/// The filtered group tree plus the filtered ungrouped list.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredTopology<'a> {
    pub groups: Vec<FilteredGroup<'a>>,
    pub ungrouped: Vec<&'a Device>,
}

impl FilteredTopology<'_> {
    /// Total number of devices shown across groups and ungrouped.
    pub fn device_count(&self) -> usize {
        self.groups.iter().map(|g| g.devices.len()).sum::<usize>() + self.ungrouped.len()
    }
}

/// Filter the topology by a free-text query.
///
/// Ids a group lists but the topology lacks are skipped silently.
pub fn filtered_topology<'a>(topology: &'a Topology, query: &str) -> FilteredTopology<'a> {
    let filter = DeviceFilter::search(query);
    let resolve = |ids: &[DeviceId]| -> Vec<&'a Device> {
        ids.iter()
            .filter_map(|&id| topology.device(id))
            .filter(|device| filter.matches(device))
            .collect()
    };

    FilteredTopology {
        groups: topology
            .groups()
            .iter()
            .map(|group| FilteredGroup {
                group,
                devices: resolve(&group.device_ids),
            })
            .collect(),
        ungrouped: resolve(topology.ungrouped_ids()),
    }
}

/// Devices to place on the map: every online selection in selection order,
/// or at most the single archive device.
pub fn selected_devices_for_map<'a>(
    topology: &'a Topology,
    selections: &Selections,
    mode: Mode,
) -> Vec<&'a Device> {
    let limit = match mode {
        Mode::Online => usize::MAX,
        Mode::Archive => 1,
    };

    selections
        .get(mode)
        .ids
        .iter()
        .take(limit)
        .filter_map(|&id| topology.device(id))
        .collect()
}

/// Archive mode focuses one device at a time: every other device is
/// disabled while one is active. Online never disables anything.
pub fn is_device_disabled(selections: &Selections, mode: Mode, id: DeviceId) -> bool {
    match mode {
        Mode::Online => false,
        Mode::Archive => selections
            .archive
            .ids
            .first()
            .is_some_and(|&active| active != id),
    }
}
