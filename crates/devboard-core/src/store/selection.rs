// ── Selection engine ──
//
// Mode-specific cardinality rules and the reconciliation pass.
//
// Invariants restored after every mutation:
// - every selected id and camera key names a device in the topology
// - archive selects at most one device
// - a camera bucket exists only for a device selected in the same mode

use strum::IntoEnumIterator;

use super::topology::Topology;
use crate::model::{DeviceId, Mode, SelectionState, Selections};

impl Selections {
    /// Toggle `id` in `mode`'s selection. Returns `true` when the device
    /// ends up selected.
    ///
    /// Archive replaces any prior selection (or clears it when `id` was the
    /// active device). Online toggles membership and keeps the order of the
    /// remaining ids. Deselected devices lose their camera bucket.
    pub(crate) fn toggle_device(&mut self, mode: Mode, id: DeviceId) -> bool {
        let SelectionState { ids, cameras } = self.get_mut(mode);
        match mode {
            Mode::Archive => {
                let was_active = ids.first() == Some(&id);
                ids.clear();
                cameras.clear();
                if !was_active {
                    ids.insert(id);
                }
                !was_active
            }
            Mode::Online => {
                if ids.shift_remove(&id) {
                    cameras.shift_remove(&id);
                    false
                } else {
                    ids.insert(id);
                    true
                }
            }
        }
    }

    /// Toggle camera `index` of `device` in `mode`.
    ///
    /// Returns `None` (and changes nothing) when the device is not selected.
    /// The bucket is created on first use and may be left empty; the
    /// reconciliation pass removes empty buckets.
    pub(crate) fn toggle_camera(
        &mut self,
        mode: Mode,
        device: DeviceId,
        index: u32,
    ) -> Option<bool> {
        let SelectionState { ids, cameras } = self.get_mut(mode);
        if !ids.contains(&device) {
            return None;
        }
        let bucket = cameras.entry(device).or_default();
        if bucket.shift_remove(&index) {
            Some(false)
        } else {
            bucket.insert(index);
            Some(true)
        }
    }

    /// Drop selections and camera buckets that no longer reference a known
    /// device, or that reference `removed`. Both modes, independently.
    /// Camera indices past the device's current camera count go too.
    ///
    /// Returns how many ids and buckets were dropped in total.
    pub(crate) fn reconcile(&mut self, topology: &Topology, removed: Option<DeviceId>) -> usize {
        let keep = |id: DeviceId| topology.contains(id) && removed != Some(id);

        let mut dropped = 0;
        for mode in Mode::iter() {
            let SelectionState { ids, cameras } = self.get_mut(mode);
            let (ids_before, cameras_before) = (ids.len(), cameras.len());

            ids.retain(|&id| keep(id));
            cameras.retain(|&id, bucket| match topology.device(id) {
                Some(device) if keep(id) => {
                    bucket.retain(|&index| index < device.camera_count);
                    true
                }
                _ => false,
            });

            dropped += ids_before - ids.len();
            dropped += cameras_before - cameras.len();
        }
        self.normalize();
        dropped
    }

    /// Enforce the rules that need no topology: archive holds at most one
    /// id, and camera buckets are non-empty and belong to selected devices.
    pub(crate) fn normalize(&mut self) {
        self.archive.ids.truncate(1);
        for mode in Mode::iter() {
            let SelectionState { ids, cameras } = self.get_mut(mode);
            cameras.retain(|id, bucket| ids.contains(id) && !bucket.is_empty());
        }
    }
}
