// ── Dashboard state store ──
//
// Topology ingest, the selection engine, view state, and the derived
// views, behind a single explicit `DashboardStore`.

pub mod derived;
mod data_store;
mod selection;
mod topology;
mod view;

pub use data_store::DashboardStore;
pub use derived::{FilteredGroup, FilteredTopology};
pub use topology::Topology;
