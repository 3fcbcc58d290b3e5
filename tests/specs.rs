//! Black-box behavioral specifications for the LaunchPad engine: the
//! literal scenarios, universal invariants, and round-trip laws a
//! conforming implementation must satisfy, exercised end-to-end against
//! the in-memory store.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use chrono::{Duration as ChronoDuration, Utc};
use launchpad_core::{
    ActionSlot, DupeFinderRegistry, ExactSpecDupeFinder, FWAction, FireworkId, Firework, FwState, LaunchIdx,
    Query, ReservationId, Workflow,
};
use launchpad_engine::{LaunchPad, LaunchPadConfig, LazyFirework, WorkflowLock};
use launchpad_storage::{BlobStore, InMemoryStore, MemBlobStore, Store};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

fn pad() -> LaunchPad<InMemoryStore> {
    LaunchPad::new(InMemoryStore::new(), LaunchPadConfig::default(), DupeFinderRegistry::new())
}

fn fw(fw_id: i64, name: &str, state: FwState, now: chrono::DateTime<Utc>) -> Firework {
    let mut f = Firework::new(name, serde_json::Map::new(), now);
    f.fw_id = FireworkId::new(fw_id);
    f.state = state;
    f.state_history = vec![launchpad_core::StateHistoryEntry::new(state, now)];
    f
}

fn single_node_workflow(fw_id: i64, state: FwState) -> Workflow {
    let mut nodes = BTreeSet::new();
    nodes.insert(fw_id);
    let fw_states = BTreeMap::from([(fw_id, state)]);
    Workflow::new(format!("wf-{fw_id}"), nodes, BTreeMap::new(), fw_states, serde_json::Map::new(), Utc::now())
        .unwrap()
}

// =====================================================================
// Scenario 1: Linear chain
// =====================================================================

#[test]
fn scenario_linear_chain_completion_reveals_the_next_ready_node() {
    let pad = pad();
    let now = Utc::now();

    let n1 = fw(1, "a", FwState::Ready, now);
    let n2 = fw(2, "b", FwState::Waiting, now);
    let n3 = fw(3, "c", FwState::Waiting, now);
    pad.store().insert_one_firework(n1).unwrap();
    pad.store().insert_one_firework(n2).unwrap();
    pad.store().insert_one_firework(n3).unwrap();

    let nodes: BTreeSet<i64> = [1, 2, 3].into_iter().collect();
    let mut links = BTreeMap::new();
    links.insert(1, vec![2]);
    links.insert(2, vec![3]);
    links.insert(3, vec![]);
    let fw_states =
        BTreeMap::from([(1, FwState::Ready), (2, FwState::Waiting), (3, FwState::Waiting)]);
    let workflow = Workflow::new("chain", nodes, links, fw_states, serde_json::Map::new(), now).unwrap();
    pad.store().insert_one_workflow(workflow).unwrap();

    let reserved = pad.reserve(&Query::new(), None, true, ReservationId::new("w1")).unwrap().unwrap();
    assert_eq!(reserved.fw_id.get(), 1);

    let mut running = reserved;
    running.transition(FwState::Running, Utc::now()).unwrap();
    pad.checkin(running, FWAction::default(), FwState::Completed).unwrap();

    let wf = pad.get_wf(1).unwrap();
    assert_eq!(wf.fw_states[&1], FwState::Completed);
    assert_eq!(wf.fw_states[&2], FwState::Ready);
    assert_eq!(wf.fw_states[&3], FwState::Waiting);
    // The general aggregate rule (READY iff any node READY and none
    // RUNNING) governs here, not the narrower RUNNING claim in the
    // scenario prose: node 2 is READY and nothing is RUNNING.
    assert_eq!(wf.state, FwState::Ready);

    let node2 = pad.get_fw(2).unwrap();
    assert_eq!(node2.state, FwState::Ready);
}

// =====================================================================
// Scenario 2: Priority ordering
// =====================================================================

#[test]
fn scenario_priority_ordering_prefers_highest_priority_then_earliest_created() {
    let pad = pad();
    let t = Utc::now();

    let mut low = fw(1, "low", FwState::Ready, t);
    low.set_priority(5);
    low.created_on = t;

    let mut earlier_ten = fw(2, "mid", FwState::Ready, t);
    earlier_ten.set_priority(10);
    earlier_ten.created_on = t + ChronoDuration::seconds(1);

    let mut later_ten = fw(3, "late", FwState::Ready, t);
    later_ten.set_priority(10);
    later_ten.created_on = t + ChronoDuration::seconds(2);

    for f in [low, earlier_ten, later_ten] {
        let wf = single_node_workflow(f.fw_id.get(), f.state);
        pad.store().insert_one_firework(f).unwrap();
        pad.store().insert_one_workflow(wf).unwrap();
    }

    let picked = pad.reserve(&Query::new(), None, true, ReservationId::new("w1")).unwrap().unwrap();
    assert_eq!(picked.fw_id.get(), 2);
    assert_eq!(picked.priority(), 10);
}

// =====================================================================
// Scenario 3: Reservation expiry
// =====================================================================

#[test]
fn scenario_reservation_expiry_recovers_to_ready_without_bumping_launch_idx() {
    let pad = pad();
    let now = Utc::now();

    let ready = fw(1, "job", FwState::Ready, now);
    pad.store().insert_one_firework(ready).unwrap();
    pad.store().insert_one_workflow(single_node_workflow(1, FwState::Ready)).unwrap();

    let reserved = pad.reserve(&Query::new(), None, true, ReservationId::new("w1")).unwrap().unwrap();
    assert_eq!(reserved.state, FwState::Reserved);
    let original_launch_idx = reserved.launch_idx;

    // Simulate the clock advancing past the reservation expiry by
    // backdating the RESERVED history entry directly.
    let mut stale = pad.get_fw(1).unwrap();
    let stale_time = Utc::now() - ChronoDuration::hours(3);
    for entry in stale.state_history.iter_mut().rev() {
        if entry.state == FwState::Reserved {
            entry.updated_on = stale_time;
            break;
        }
    }
    pad.store().find_one_and_replace_firework(stale).unwrap();

    let recovered = pad.detect_unreserved(Duration::from_secs(60 * 60 * 2), true).unwrap();
    assert_eq!(recovered, vec![1]);

    let after = pad.get_fw(1).unwrap();
    assert_eq!(after.state, FwState::Ready);
    assert_eq!(after.launch_idx, original_launch_idx);
}

// =====================================================================
// Scenario 4: Duplicate theft
// =====================================================================

#[test]
fn scenario_duplicate_theft_links_bidirectionally_without_double_dispatch() {
    let mut registry = DupeFinderRegistry::new();
    registry.register(Arc::new(ExactSpecDupeFinder));
    let pad = LaunchPad::new(InMemoryStore::new(), LaunchPadConfig::default(), registry);
    let t = Utc::now();

    let spec = serde_json::json!({"kind": "render", "_dupefinder": "exact_spec"}).as_object().unwrap().clone();

    let mut a = Firework::new("render", spec.clone(), t);
    a.fw_id = FireworkId::new(1);
    a.created_on = t;
    let mut b = Firework::new("render", spec, t);
    b.fw_id = FireworkId::new(2);
    b.created_on = t + ChronoDuration::seconds(1);

    for f in [a, b] {
        let wf = single_node_workflow(f.fw_id.get(), f.state);
        pad.store().insert_one_firework(f).unwrap();
        pad.store().insert_one_workflow(wf).unwrap();
    }

    let first = pad.reserve(&Query::new(), None, true, ReservationId::new("w1")).unwrap().unwrap();
    assert_eq!(first.fw_id.get(), 1);
    assert!(first.duplicates.contains(&2));

    let partner = pad.get_fw(2).unwrap();
    assert!(partner.duplicates.contains(&1));
    assert_eq!(partner.state, FwState::Ready, "the unclaimed partner is linked, not reserved");

    // A second reserve_ready attempt finds only the partner READY, discovers
    // it duplicates an already-reserved firework, and does not hand it out.
    let second = pad.reserve(&Query::new(), None, true, ReservationId::new("w2")).unwrap();
    assert!(second.is_none());

    let partner_after = pad.get_fw(2).unwrap();
    assert_eq!(partner_after.state, FwState::Defused, "a stolen candidate is defused, not left reserved");
}

// =====================================================================
// Scenario 5: Large action spillover
// =====================================================================

#[test]
fn scenario_large_action_spillover_rehydrates_through_the_blob_store() {
    let store = InMemoryStore::new()
        .with_blob_store(Box::new(MemBlobStore::new()))
        .with_document_size_limit(600);
    let pad = LaunchPad::new(store, LaunchPadConfig::default(), DupeFinderRegistry::new());
    let now = Utc::now();

    let running = fw(1, "job", FwState::Running, now);
    pad.store().insert_one_firework(running.clone()).unwrap();
    pad.store().insert_one_workflow(single_node_workflow(1, FwState::Running)).unwrap();

    let mut action = FWAction::default();
    action.stored_data.insert("payload".to_string(), serde_json::json!("x".repeat(1000)));

    let checked_in = pad.checkin(running, action.clone(), FwState::Completed).unwrap();
    match &checked_in.action {
        ActionSlot::Spillover { spillover_id } => {
            let blob = pad.store().blob_store().unwrap();
            let bytes = blob.get(spillover_id).unwrap();
            let rehydrated: FWAction = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(rehydrated, action);
        }
        ActionSlot::Inline(_) => panic!("expected the oversize action to spill to the blob store"),
    }

    let lazy = LazyFirework::new(pad.store(), 1);
    assert_eq!(lazy.action().unwrap(), action);
}

// =====================================================================
// Scenario 6: Lock contention
// =====================================================================

#[test]
fn scenario_lock_contention_times_out_without_mutating_the_workflow() {
    let store = Arc::new(InMemoryStore::new());
    store.insert_one_firework(fw(1, "job", FwState::Ready, Utc::now())).unwrap();
    store.insert_one_workflow(single_node_workflow(1, FwState::Ready)).unwrap();

    let holder = WorkflowLock::acquire(&*store, 1, Duration::from_secs(5), false).unwrap();

    let started = std::time::Instant::now();
    let err = launchpad_engine::refresh_workflow(&*store, 1, FwState::Ready, Duration::from_millis(100), false)
        .unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, launchpad_engine::LaunchPadError::LockedWorkflow { fw_id: 1 }));
    assert!(elapsed < Duration::from_millis(500), "should fail close to the 100ms deadline, took {elapsed:?}");

    drop(holder);
    let wf = store.get_workflow(1).unwrap().unwrap();
    assert_eq!(wf.fw_states[&1], FwState::Ready, "the workflow was not mutated by the failed refresh");
}

// =====================================================================
// Universal invariants
// =====================================================================

#[test]
fn invariant_fw_id_and_launch_idx_pair_is_unique() {
    let store = InMemoryStore::new();
    let now = Utc::now();
    store.insert_one_firework(fw(1, "a", FwState::Waiting, now)).unwrap();

    let err = store.insert_one_firework(fw(1, "a-again", FwState::Waiting, now)).unwrap_err();
    assert!(matches!(err, launchpad_storage::StoreError::DuplicateKey { fw_id: 1, launch_idx: 0 }));
}

#[test]
fn invariant_successful_reserve_ready_yields_reserved_state_and_fresh_updated_on() {
    let pad = pad();
    let now = Utc::now();
    pad.store().insert_one_firework(fw(1, "job", FwState::Ready, now)).unwrap();
    pad.store().insert_one_workflow(single_node_workflow(1, FwState::Ready)).unwrap();

    let before = Utc::now();
    let reserved = pad.reserve(&Query::new(), None, true, ReservationId::new("w1")).unwrap().unwrap();
    assert_eq!(reserved.state, FwState::Reserved);
    assert!(reserved.updated_on >= before);
}

#[test]
fn invariant_concurrent_reserve_ready_hands_out_a_firework_to_exactly_one_caller() {
    let store = Arc::new(InMemoryStore::new());
    store.insert_one_firework(fw(1, "job", FwState::Ready, Utc::now())).unwrap();
    store.insert_one_workflow(single_node_workflow(1, FwState::Ready)).unwrap();
    let dupefinders = Arc::new(DupeFinderRegistry::new());

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = Arc::clone(&store);
        let dupefinders = Arc::clone(&dupefinders);
        handles.push(std::thread::spawn(move || {
            launchpad_engine::Dispatcher::new(&*store, &dupefinders, true)
                .reserve_ready(&Query::new(), None, true, ReservationId::new(format!("w{i}")))
                .unwrap()
        }));
    }

    let winners: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).filter(|r| r.is_some()).collect();
    assert_eq!(winners.len(), 1, "exactly one caller should receive the firework");
}

// =====================================================================
// Round-trip laws
// =====================================================================

#[test]
fn roundtrip_firework_and_workflow_serde_is_identity() {
    let now = Utc::now();
    let f = fw(1, "job", FwState::Ready, now);
    let encoded = serde_json::to_value(&f).unwrap();
    let decoded: Firework = serde_json::from_value(encoded).unwrap();
    assert_eq!(f, decoded);

    let wf = single_node_workflow(1, FwState::Ready);
    let encoded = serde_json::to_value(&wf).unwrap();
    let decoded: Workflow = serde_json::from_value(encoded).unwrap();
    assert_eq!(wf, decoded);
}

#[test]
fn roundtrip_add_wf_then_get_wf_preserves_structure() {
    let pad = pad();
    let mut a = Firework::new("a", serde_json::Map::new(), Utc::now());
    let mut b = Firework::new("b", serde_json::Map::new(), Utc::now());
    a.fw_id = FireworkId::new(-1);
    b.fw_id = FireworkId::new(-2);

    let mut nodes = BTreeSet::new();
    nodes.insert(-1);
    nodes.insert(-2);
    let mut links = BTreeMap::new();
    links.insert(-1, vec![-2]);
    let fw_states = BTreeMap::from([(-1, FwState::Waiting), (-2, FwState::Waiting)]);
    let workflow =
        Workflow::new("pair", nodes, links, fw_states, serde_json::Map::new(), Utc::now()).unwrap();

    let inserted = pad.add_wf(workflow, vec![a, b]).unwrap();
    let parent = *inserted.nodes.iter().next().unwrap();

    let fetched = pad.get_wf(parent).unwrap();
    assert_eq!(fetched.nodes, inserted.nodes);
    assert_eq!(fetched.links, inserted.links);
    assert_eq!(fetched.name, inserted.name);
    assert_eq!(fetched.metadata, inserted.metadata);
}

#[test]
fn roundtrip_rerun_then_reserve_ready_yields_a_strictly_greater_launch_idx() {
    let pad = pad();
    let now = Utc::now();
    let mut completed = fw(1, "job", FwState::Running, now);
    completed.transition(FwState::Completed, now).unwrap();
    pad.store().insert_one_firework(completed).unwrap();
    pad.store().insert_one_workflow(single_node_workflow(1, FwState::Completed)).unwrap();

    let rerun = pad.rerun(1).unwrap();
    assert_eq!(rerun.launch_idx, LaunchIdx::FIRST.next());

    let reserved =
        pad.reserve(&Query::new(), Some(1), true, ReservationId::new("w1")).unwrap().unwrap();
    assert_eq!(reserved.fw_id.get(), 1);
    assert!(reserved.launch_idx > LaunchIdx::FIRST);
}
