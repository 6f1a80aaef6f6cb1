// ── Domain model ──
//
// Canonical dashboard types: identifiers, topology entities, per-mode
// selections, view flags, and the durable snapshot.

pub mod device;
pub mod entity_id;
pub mod persisted;
pub mod selection;
pub mod view;

pub use device::{Device, DeviceGroup, TopologySnapshot};
pub use entity_id::{DeviceId, GroupId};
pub use persisted::{PersistedState, STORAGE_KEY};
pub use selection::{Mode, SelectionState, Selections};
pub use view::ViewFlags;
