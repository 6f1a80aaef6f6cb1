// ── Selection model ──
//
// Each mode owns an independent SelectionState. The rules that mutate
// them live in `store::selection`.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use super::entity_id::DeviceId;

/// Which selection context is active.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    /// Live view: any number of devices, in selection order.
    #[default]
    Online,
    /// Recorded footage: a single device at a time.
    Archive,
}

/// Selected devices and their selected cameras for one mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    #[serde(default)]
    pub ids: IndexSet<DeviceId>,

    #[serde(default)]
    pub cameras: IndexMap<DeviceId, IndexSet<u32>>,
}

impl SelectionState {
    pub fn contains(&self, id: DeviceId) -> bool {
        self.ids.contains(&id)
    }

    /// Selected ids in selection order.
    pub fn selected_ids(&self) -> Vec<DeviceId> {
        self.ids.iter().copied().collect()
    }

    /// Selected camera indices for `id`, in toggle order.
    pub fn cameras_for(&self, id: DeviceId) -> Vec<u32> {
        self.cameras
            .get(&id)
            .map(|bucket| bucket.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.cameras.is_empty()
    }
}

/// Both modes' selections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selections {
    #[serde(default)]
    pub online: SelectionState,

    #[serde(default)]
    pub archive: SelectionState,
}

impl Selections {
    pub fn get(&self, mode: Mode) -> &SelectionState {
        match mode {
            Mode::Online => &self.online,
            Mode::Archive => &self.archive,
        }
    }

    pub(crate) fn get_mut(&mut self, mode: Mode) -> &mut SelectionState {
        match mode {
            Mode::Online => &mut self.online,
            Mode::Archive => &mut self.archive,
        }
    }
}
