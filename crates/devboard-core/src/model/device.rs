// ── Device and topology types ──

use std::collections::BTreeMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::entity_id::{DeviceId, GroupId};
use crate::error::CoreError;

/// A monitored device as delivered by the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: DeviceId,
    pub name: String,

    /// Number of cameras attached. Camera indices are `0..camera_count`.
    #[serde(default)]
    pub camera_count: u32,

    /// All remaining fields the feed sends, kept verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Device {
    pub fn new(id: impl Into<DeviceId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            camera_count: 0,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_cameras(mut self, camera_count: u32) -> Self {
        self.camera_count = camera_count;
        self
    }

    pub fn camera_indices(&self) -> Range<u32> {
        0..self.camera_count
    }
}

/// A named group of devices. Order of `device_ids` is display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceGroup {
    pub id: GroupId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub device_ids: Vec<DeviceId>,
}

impl DeviceGroup {
    pub fn new(id: impl Into<GroupId>, device_ids: impl IntoIterator<Item = DeviceId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            device_ids: device_ids.into_iter().collect(),
        }
    }
}

/// One full topology payload from the feed. Replaces the previous one
/// wholesale; there is no incremental diff.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologySnapshot {
    #[serde(default)]
    pub groups: Vec<DeviceGroup>,

    #[serde(default)]
    pub devices: BTreeMap<DeviceId, Device>,
}

impl TopologySnapshot {
    pub fn new(groups: Vec<DeviceGroup>, devices: impl IntoIterator<Item = Device>) -> Self {
        Self {
            groups,
            devices: devices.into_iter().map(|d| (d.id, d)).collect(),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(raw)?)
    }
}
