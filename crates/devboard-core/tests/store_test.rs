#![allow(clippy::unwrap_used)]
// Integration tests for `DashboardStore`: selection rules, reconciliation,
// persistence round trips, and the invariants under long action sequences.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use devboard_core::{
    DashboardStore, Device, DeviceGroup, DeviceId, GroupId, MemoryStorage, Mode, PersistedState,
    PersistenceGateway, STORAGE_KEY, Selections, StateStorage, StoreOptions, TopologySnapshot,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn id(raw: u32) -> DeviceId {
    DeviceId::new(raw)
}

fn ids(raw: &[u32]) -> Vec<DeviceId> {
    raw.iter().copied().map(DeviceId::new).collect()
}

fn snapshot(groups: Vec<DeviceGroup>, devices: &[u32]) -> TopologySnapshot {
    TopologySnapshot::new(
        groups,
        devices
            .iter()
            .map(|&d| Device::new(d, format!("Device {d}")).with_cameras(4)),
    )
}

fn scenario_a_snapshot() -> TopologySnapshot {
    snapshot(vec![DeviceGroup::new("g1", ids(&[1, 2]))], &[1, 2, 3])
}

fn store_with(storage: &Arc<MemoryStorage>) -> DashboardStore {
    DashboardStore::new(PersistenceGateway::new(Arc::clone(storage)))
}

fn stored(storage: &MemoryStorage) -> PersistedState {
    let raw = storage.get(STORAGE_KEY).unwrap().unwrap();
    serde_json::from_str(&raw).unwrap()
}

// ── Scenarios ───────────────────────────────────────────────────────

#[test]
fn scenario_a_online_selection_survives_removal_of_other_device() {
    let mut store = DashboardStore::default();
    store.replace_topology(scenario_a_snapshot());
    assert_eq!(store.ungrouped_ids(), ids(&[3]).as_slice());

    store.toggle_device_selection(id(1));
    store.toggle_device_selection(id(2));
    assert_eq!(store.current_selection().selected_ids(), ids(&[1, 2]));

    assert_eq!(store.toggle_camera(id(1), 0), Some(true));
    assert_eq!(store.cameras_for_device(id(1)), vec![0]);

    assert!(store.remove_device(id(2)));
    assert_eq!(store.current_selection().selected_ids(), ids(&[1]));
    assert_eq!(store.cameras_for_device(id(1)), vec![0]);
    assert_eq!(store.current_selection().cameras.len(), 1);
    assert_eq!(store.groups()[0].device_ids, ids(&[1]));
}

#[test]
fn scenario_b_archive_replaces_selection_without_camera_carryover() {
    let mut store = DashboardStore::default();
    store.replace_topology(snapshot(Vec::new(), &[5, 7]));
    store.set_mode(Mode::Archive);

    store.toggle_device_selection(id(5));
    store.toggle_camera(id(5), 2);
    assert_eq!(store.current_selection().selected_ids(), ids(&[5]));

    store.toggle_device_selection(id(7));
    assert_eq!(store.current_selection().selected_ids(), ids(&[7]));
    assert!(store.cameras_for_device(id(5)).is_empty());
    assert!(store.cameras_for_device(id(7)).is_empty());
    assert!(store.current_selection().cameras.is_empty());
}

#[test]
fn scenario_c_search_matches_name_or_id() {
    let mut store = DashboardStore::default();
    store.replace_topology(TopologySnapshot::new(
        Vec::new(),
        [
            Device::new(7, "Cam A"),
            Device::new(13, "Cam B"),
            Device::new(21, "Gate 7"),
            Device::new(30, "Lobby"),
        ],
    ));

    store.set_search_query("7");
    let view = store.filtered_topology();
    let shown: Vec<_> = view.ungrouped.iter().map(|d| d.id).collect();
    assert_eq!(shown, ids(&[7, 21]));

    store.set_search_query("cam b");
    let view = store.filtered_topology();
    let shown: Vec<_> = view.ungrouped.iter().map(|d| d.id).collect();
    assert_eq!(shown, ids(&[13]));
}

#[test]
fn scenario_d_malformed_storage_yields_defaults() {
    let storage = Arc::new(MemoryStorage::new().with_entry(STORAGE_KEY, "<<< definitely not json"));
    let store = store_with(&storage);

    assert_eq!(store.mode(), Mode::Online);
    assert_eq!(store.persisted_state(), PersistedState::default());
    assert!(store.is_loading());
}

// ── Selection engine ────────────────────────────────────────────────

#[test]
fn camera_toggle_on_unselected_device_is_noop() {
    let storage = Arc::new(MemoryStorage::new());
    let mut store = store_with(&storage);
    store.replace_topology(scenario_a_snapshot());
    let revision = store.revision();

    assert_eq!(store.toggle_camera(id(1), 0), None);
    assert!(store.current_selection().cameras.is_empty());
    assert_eq!(store.revision(), revision);
}

#[test]
fn selecting_unknown_device_is_ignored_once_loaded() {
    let storage = Arc::new(MemoryStorage::new());
    let mut store = store_with(&storage);
    store.replace_topology(snapshot(Vec::new(), &[1]));
    store.toggle_device_selection(id(1));
    let revision = store.revision();
    let saved = stored(&storage);

    assert!(!store.toggle_device_selection(id(999)));
    assert_eq!(store.current_selection().selected_ids(), ids(&[1]));
    assert_eq!(store.toggle_camera(id(999), 0), None);
    assert_eq!(store.revision(), revision);
    assert_eq!(stored(&storage), saved);

    store.set_mode(Mode::Archive);
    assert!(!store.toggle_device_selection(id(999)));
    assert!(store.current_selection().is_empty());
}

#[test]
fn selection_before_first_snapshot_is_settled_by_it() {
    let mut store = DashboardStore::default();
    assert!(store.toggle_device_selection(id(999)));
    assert!(store.toggle_device_selection(id(1)));

    store.replace_topology(snapshot(Vec::new(), &[1]));
    assert_eq!(store.current_selection().selected_ids(), ids(&[1]));
}

#[test]
fn camera_outside_device_range_is_rejected() {
    let storage = Arc::new(MemoryStorage::new());
    let mut store = store_with(&storage);
    store.replace_topology(TopologySnapshot::new(
        Vec::new(),
        [Device::new(1, "Gate").with_cameras(2)],
    ));
    store.toggle_device_selection(id(1));
    let revision = store.revision();

    assert_eq!(store.toggle_camera(id(1), 77), None);
    assert_eq!(store.toggle_camera(id(1), 2), None);
    assert_eq!(store.revision(), revision);
    assert!(stored(&storage).selections.online.cameras.is_empty());

    assert_eq!(store.toggle_camera(id(1), 1), Some(true));
}

#[test]
fn shrinking_camera_count_trims_selection() {
    let mut store = DashboardStore::default();
    store.replace_topology(snapshot(Vec::new(), &[1]));
    store.toggle_device_selection(id(1));
    store.toggle_camera(id(1), 0);
    store.toggle_camera(id(1), 3);

    store.replace_topology(TopologySnapshot::new(
        Vec::new(),
        [Device::new(1, "Device 1").with_cameras(2)],
    ));
    assert_eq!(store.cameras_for_device(id(1)), vec![0]);
}

#[test]
fn set_mode_to_active_mode_is_noop() {
    let mut store = DashboardStore::default();
    let revision = store.revision();
    assert!(!store.set_mode(Mode::Online));
    assert_eq!(store.revision(), revision);
    assert!(store.set_mode(Mode::Archive));
    assert_eq!(store.mode(), Mode::Archive);
}

#[test]
fn archive_disables_other_devices() {
    let mut store = DashboardStore::default();
    store.replace_topology(scenario_a_snapshot());
    store.set_mode(Mode::Archive);
    store.toggle_device_selection(id(2));

    assert!(store.is_device_disabled(id(1)));
    assert!(!store.is_device_disabled(id(2)));
    assert!(store.is_device_selected(id(2)));

    store.set_mode(Mode::Online);
    assert!(!store.is_device_disabled(id(1)));
    assert!(!store.is_device_selected(id(2)));
}

#[test]
fn map_devices_follow_active_mode() {
    let mut store = DashboardStore::default();
    store.replace_topology(scenario_a_snapshot());
    store.toggle_device_selection(id(3));
    store.toggle_device_selection(id(1));
    store.set_mode(Mode::Archive);
    store.toggle_device_selection(id(2));

    let archive: Vec<_> = store.selected_devices_for_map().iter().map(|d| d.id).collect();
    assert_eq!(archive, ids(&[2]));

    store.set_mode(Mode::Online);
    let online: Vec<_> = store.selected_devices_for_map().iter().map(|d| d.id).collect();
    assert_eq!(online, ids(&[3, 1]));
}

#[test]
fn remove_unknown_device_is_noop() {
    let storage = Arc::new(MemoryStorage::new());
    let mut store = store_with(&storage);
    store.replace_topology(scenario_a_snapshot());
    let before = stored(&storage);

    assert!(!store.remove_device(id(99)));
    assert_eq!(stored(&storage), before);
}

#[test]
fn removed_device_is_dropped_from_both_modes() {
    let mut store = DashboardStore::default();
    store.replace_topology(scenario_a_snapshot());
    store.toggle_device_selection(id(2));
    store.set_mode(Mode::Archive);
    store.toggle_device_selection(id(2));
    store.toggle_camera(id(2), 1);

    store.remove_device(id(2));
    assert!(store.selection(Mode::Online).is_empty());
    assert!(store.selection(Mode::Archive).is_empty());
}

#[test]
fn empty_topology_clears_all_selections() {
    let mut store = DashboardStore::default();
    store.replace_topology(scenario_a_snapshot());
    store.toggle_device_selection(id(1));
    store.toggle_camera(id(1), 3);

    store.replace_topology(TopologySnapshot::default());
    assert!(store.ungrouped_ids().is_empty());
    assert!(store.selection(Mode::Online).is_empty());
    assert!(!store.is_loading());
}

// ── View state ──────────────────────────────────────────────────────

#[test]
fn collapse_flags_persist_but_search_does_not() {
    let storage = Arc::new(MemoryStorage::new());
    let mut store = store_with(&storage);
    let g1 = GroupId::from("g1");

    assert!(store.toggle_group_collapse(&g1));
    assert!(store.toggle_device_collapse(id(3)));
    store.set_search_query("gate");

    let saved = stored(&storage);
    assert!(saved.collapsed_groups.contains(&g1));
    assert!(saved.collapsed_devices.contains(&id(3)));

    let restored = store_with(&storage);
    assert!(restored.is_group_collapsed(&g1));
    assert!(restored.is_device_collapsed(id(3)));
    assert_eq!(restored.search_query(), "");
}

#[test]
fn device_collapse_flag_survives_removal_by_default() {
    let mut store = DashboardStore::default();
    store.replace_topology(scenario_a_snapshot());
    store.toggle_device_collapse(id(2));

    store.remove_device(id(2));
    assert!(store.is_device_collapsed(id(2)));
}

#[test]
fn device_collapse_flag_purged_when_policy_enabled() {
    let options = StoreOptions {
        purge_collapse_on_remove: true,
    };
    let mut store = DashboardStore::with_options(PersistenceGateway::ephemeral(), options);
    store.replace_topology(scenario_a_snapshot());
    store.toggle_device_collapse(id(2));

    store.remove_device(id(2));
    assert!(!store.is_device_collapsed(id(2)));
}

// ── Persistence ─────────────────────────────────────────────────────

#[test]
fn state_round_trips_through_storage() {
    let storage = Arc::new(MemoryStorage::new());
    {
        let mut store = store_with(&storage);
        store.replace_topology(scenario_a_snapshot());
        store.toggle_device_selection(id(2));
        store.toggle_device_selection(id(1));
        store.toggle_camera(id(1), 3);
        store.set_mode(Mode::Archive);
        store.toggle_device_selection(id(3));
    }

    let store = store_with(&storage);
    assert_eq!(store.mode(), Mode::Archive);
    assert_eq!(store.selection(Mode::Online).selected_ids(), ids(&[2, 1]));
    assert_eq!(store.selection(Mode::Online).cameras_for(id(1)), vec![3]);
    assert_eq!(store.current_selection().selected_ids(), ids(&[3]));
}

#[test]
fn restored_selection_is_reconciled_on_first_snapshot() {
    let raw = serde_json::json!({
        "mode": "online",
        "selections": {
            "online": { "ids": [1, 42], "cameras": { "42": [0] } },
            "archive": { "ids": [42], "cameras": {} }
        }
    })
    .to_string();
    let storage = Arc::new(MemoryStorage::new().with_entry(STORAGE_KEY, raw));
    let mut store = store_with(&storage);

    // Nothing can be checked before the topology is known.
    assert_eq!(store.current_selection().selected_ids(), ids(&[1, 42]));

    store.replace_topology(scenario_a_snapshot());
    assert_eq!(store.current_selection().selected_ids(), ids(&[1]));
    assert!(store.selection(Mode::Archive).is_empty());
    assert_eq!(stored(&storage).selections, store.selections().clone());
}

#[test]
fn saved_state_never_references_removed_device() {
    let storage = Arc::new(MemoryStorage::new());
    let mut store = store_with(&storage);
    store.replace_topology(scenario_a_snapshot());
    store.toggle_device_selection(id(3));
    store.toggle_camera(id(3), 1);

    store.remove_device(id(3));
    let saved = stored(&storage);
    assert!(!saved.selections.online.ids.contains(&id(3)));
    assert!(!saved.selections.online.cameras.contains_key(&id(3)));
}

#[test]
fn every_mutation_bumps_revision() {
    let mut store = DashboardStore::default();
    let changes = store.subscribe();
    assert_eq!(changes.current(), 0);

    store.replace_topology(scenario_a_snapshot());
    store.toggle_device_selection(id(1));
    store.set_search_query("x");
    assert_eq!(changes.latest(), 3);
}

// ── Invariants under action sequences ───────────────────────────────

/// Tiny deterministic generator so sequences are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: u32) -> u32 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        u32::try_from((self.0 >> 33) % u64::from(bound)).unwrap()
    }
}

fn random_snapshot(rng: &mut Lcg) -> TopologySnapshot {
    let devices: Vec<u32> = (1..=8).filter(|_| rng.next(3) != 0).collect();
    let grouped: Vec<DeviceId> = devices
        .iter()
        .copied()
        .filter(|_| rng.next(2) == 0)
        .map(DeviceId::new)
        .collect();
    snapshot(vec![DeviceGroup::new("g", grouped)], &devices)
}

/// Ids range past the 8 devices a generated snapshot can hold, and camera
/// indices past the 4 cameras each device has.
fn apply_random_action(store: &mut DashboardStore, rng: &mut Lcg) {
    let device = id(rng.next(10) + 1);
    match rng.next(8) {
        0 => store.replace_topology(random_snapshot(rng)),
        1 => {
            store.remove_device(device);
        }
        2 => {
            let mode = if rng.next(2) == 0 { Mode::Online } else { Mode::Archive };
            store.set_mode(mode);
        }
        3 => {
            store.toggle_camera(device, rng.next(6));
        }
        4 => {
            store.toggle_device_collapse(device);
        }
        _ => {
            store.toggle_device_selection(device);
        }
    }
}

fn assert_invariants(store: &DashboardStore) {
    for mode in [Mode::Online, Mode::Archive] {
        let selection = store.selection(mode);
        for key in selection.cameras.keys() {
            assert!(selection.ids.contains(key), "camera bucket for unselected {key} in {mode}");
        }
    }
    assert!(store.selection(Mode::Archive).ids.len() <= 1);
}

fn assert_referentially_sound(store: &DashboardStore, selections: &Selections) {
    for mode in [Mode::Online, Mode::Archive] {
        let selection = selections.get(mode);
        for &d in selection.ids.iter().chain(selection.cameras.keys()) {
            assert!(store.device(d).is_some(), "{mode} references missing device {d}");
        }
        for (&d, bucket) in &selection.cameras {
            let count = store.device(d).map_or(0, |device| device.camera_count);
            assert!(bucket.iter().all(|&c| c < count), "{mode} camera past count on {d}");
        }
    }
}

#[test]
fn invariants_hold_for_random_action_sequences() {
    for seed in 0..40 {
        let mut rng = Lcg(seed);
        let storage = Arc::new(MemoryStorage::new());
        let mut store = store_with(&storage);
        store.replace_topology(random_snapshot(&mut rng));

        for _ in 0..200 {
            apply_random_action(&mut store, &mut rng);
            assert_invariants(&store);
            assert_referentially_sound(&store, store.selections());
            assert_referentially_sound(&store, &stored(&storage).selections);
        }
    }
}

#[test]
fn replacing_with_identical_snapshot_is_idempotent() {
    let mut rng = Lcg(7);
    let mut store = DashboardStore::default();
    store.replace_topology(random_snapshot(&mut rng));
    for _ in 0..50 {
        apply_random_action(&mut store, &mut rng);
    }

    let snap = random_snapshot(&mut rng);
    store.replace_topology(snap.clone());
    let once = (store.persisted_state(), store.topology().clone());
    store.replace_topology(snap);
    let twice = (store.persisted_state(), store.topology().clone());

    assert_eq!(once, twice);
}

#[test]
fn online_actions_never_touch_archive() {
    let mut rng = Lcg(11);
    let mut store = DashboardStore::default();
    store.replace_topology(snapshot(Vec::new(), &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]));
    store.set_mode(Mode::Archive);
    store.toggle_device_selection(id(4));
    store.toggle_camera(id(4), 2);
    let archive = store.selection(Mode::Archive).clone();

    store.set_mode(Mode::Online);
    for _ in 0..100 {
        let device = id(rng.next(10) + 1);
        if rng.next(2) == 0 {
            store.toggle_device_selection(device);
        } else {
            store.toggle_camera(device, rng.next(4));
        }
    }
    assert_eq!(store.selection(Mode::Archive), &archive);

    let online = store.selection(Mode::Online).clone();
    store.set_mode(Mode::Archive);
    store.toggle_device_selection(id(9));
    store.toggle_camera(id(9), 0);
    assert_eq!(store.selection(Mode::Online), &online);
}
