// ── Filter predicates for device listings ──
//
// Used by the derived views to narrow the topology without touching it.

use crate::model::Device;

/// Filter predicate for devices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceFilter {
    All,
    /// Lowercased, trimmed needle. Matches a name substring
    /// (case-insensitive) or a substring of the decimal id.
    Search(String),
}

impl DeviceFilter {
    /// Build a search filter from raw user input. Blank input matches all.
    pub fn search(query: &str) -> Self {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            Self::All
        } else {
            Self::Search(needle)
        }
    }

    pub fn matches(&self, device: &Device) -> bool {
        match self {
            Self::All => true,
            Self::Search(needle) => {
                device.name.to_lowercase().contains(needle.as_str())
                    || device.id.to_string().contains(needle.as_str())
            }
        }
    }
}
