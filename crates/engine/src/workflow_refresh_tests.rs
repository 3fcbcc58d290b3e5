// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use launchpad_core::{FireworkId, LaunchIdx};
use launchpad_storage::InMemoryStore;
use std::collections::{BTreeMap, BTreeSet};

fn firework(fw_id: i64, state: FwState) -> launchpad_core::Firework {
    let now = Utc::now();
    let mut fw = launchpad_core::Firework::new("n", serde_json::Map::new(), now);
    fw.fw_id = FireworkId::new(fw_id);
    fw.launch_idx = LaunchIdx::FIRST;
    fw.state = state;
    fw.state_history = vec![launchpad_core::StateHistoryEntry::new(state, now)];
    fw
}

fn linear_workflow() -> launchpad_core::Workflow {
    let now = Utc::now();
    let mut nodes = BTreeSet::new();
    nodes.insert(1);
    nodes.insert(2);
    let mut links = BTreeMap::new();
    links.insert(1, vec![2]);
    let fw_states = BTreeMap::from([(1, FwState::Running), (2, FwState::Waiting)]);
    launchpad_core::Workflow::new("wf", nodes, links, fw_states, serde_json::Map::new(), now).unwrap()
}

#[test]
fn completion_promotes_waiting_child_to_ready() {
    let store = InMemoryStore::new();
    store.insert_one_workflow(linear_workflow()).unwrap();
    store.insert_one_firework(firework(1, FwState::Completed)).unwrap();
    store.insert_one_firework(firework(2, FwState::Waiting)).unwrap();

    refresh_workflow(&store, 1, FwState::Completed, Duration::from_millis(200), false).unwrap();

    let child = store.get_firework(2).unwrap().unwrap();
    assert_eq!(child.state, FwState::Ready);

    let wf = store.get_workflow(1).unwrap().unwrap();
    assert_eq!(wf.state, FwState::Ready);
}

#[test]
fn missing_workflow_fails_at_lock_acquisition() {
    let store = InMemoryStore::new();
    let err = refresh_workflow(&store, 99, FwState::Completed, Duration::from_millis(50), false).unwrap_err();
    assert!(matches!(err, LaunchPadError::Store(_)));
}
