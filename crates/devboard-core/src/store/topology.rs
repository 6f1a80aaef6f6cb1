// ── Topology ingest ──
//
// Holds the groups and devices last delivered by the feed. Every snapshot
// replaces the previous topology wholesale; the ungrouped list is derived
// at replace time and kept in step on device removal.

use std::collections::{BTreeMap, HashSet};

use crate::model::{Device, DeviceGroup, DeviceId, TopologySnapshot};

/// Current groups and devices, plus the devices no group lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    groups: Vec<DeviceGroup>,
    devices: BTreeMap<DeviceId, Device>,
    ungrouped: Vec<DeviceId>,
    loaded: bool,
}

impl Topology {
    /// Replace everything with `snapshot`. No merge.
    pub(crate) fn replace(&mut self, snapshot: TopologySnapshot) {
        let TopologySnapshot { groups, devices } = snapshot;
        self.ungrouped = compute_ungrouped(&groups, &devices);
        self.groups = groups;
        self.devices = devices;
        self.loaded = true;
    }

    /// Delete one device and strip it from every group and from the
    /// ungrouped list. Returns `None` when the device is unknown.
    pub(crate) fn remove_device(&mut self, id: DeviceId) -> Option<Device> {
        let removed = self.devices.remove(&id)?;
        for group in &mut self.groups {
            group.device_ids.retain(|&d| d != id);
        }
        self.ungrouped.retain(|&d| d != id);
        Some(removed)
    }

    pub fn groups(&self) -> &[DeviceGroup] {
        &self.groups
    }

    pub fn devices(&self) -> &BTreeMap<DeviceId, Device> {
        &self.devices
    }

    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get(&id)
    }

    pub fn contains(&self, id: DeviceId) -> bool {
        self.devices.contains_key(&id)
    }

    /// Devices not listed by any group, in ascending id order.
    pub fn ungrouped_ids(&self) -> &[DeviceId] {
        &self.ungrouped
    }

    /// `true` once at least one snapshot has been applied.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }
}

/// All device ids minus the union of every group's members.
fn compute_ungrouped(
    groups: &[DeviceGroup],
    devices: &BTreeMap<DeviceId, Device>,
) -> Vec<DeviceId> {
    let grouped: HashSet<DeviceId> = groups
        .iter()
        .flat_map(|g| g.device_ids.iter().copied())
        .collect();

    devices
        .keys()
        .copied()
        .filter(|id| !grouped.contains(id))
        .collect()
}
