// ── View state ──
//
// Collapse toggles and the search filter. Pure set membership; nothing
// here references the topology.

use crate::model::{DeviceId, GroupId, ViewFlags};

impl ViewFlags {
    /// Returns `true` when the group is collapsed after the toggle.
    pub(crate) fn toggle_group(&mut self, id: &GroupId) -> bool {
        if self.collapsed_groups.shift_remove(id) {
            false
        } else {
            self.collapsed_groups.insert(id.clone());
            true
        }
    }

    /// Returns `true` when the device is collapsed after the toggle.
    pub(crate) fn toggle_device(&mut self, id: DeviceId) -> bool {
        if self.collapsed_devices.shift_remove(&id) {
            false
        } else {
            self.collapsed_devices.insert(id);
            true
        }
    }

    pub(crate) fn forget_device(&mut self, id: DeviceId) -> bool {
        self.collapsed_devices.shift_remove(&id)
    }

    pub fn is_group_collapsed(&self, id: &GroupId) -> bool {
        self.collapsed_groups.contains(id)
    }

    pub fn is_device_collapsed(&self, id: DeviceId) -> bool {
        self.collapsed_devices.contains(&id)
    }
}
