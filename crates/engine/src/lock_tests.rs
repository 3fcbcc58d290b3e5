// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use launchpad_core::FwState;
use launchpad_storage::{InMemoryStore, Store};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

fn make_workflow(fw_id: i64) -> launchpad_core::Workflow {
    let now = chrono::Utc::now();
    let mut nodes = BTreeSet::new();
    nodes.insert(fw_id);
    launchpad_core::Workflow::new(
        "wf",
        nodes,
        BTreeMap::new(),
        BTreeMap::from([(fw_id, FwState::Waiting)]),
        serde_json::Map::new(),
        now,
    )
    .unwrap()
}

#[test]
fn acquire_then_release_allows_a_second_acquire() {
    let store = InMemoryStore::new();
    store.insert_one_workflow(make_workflow(1)).unwrap();

    {
        let _lock = WorkflowLock::acquire(&store, 1, Duration::from_millis(50), false).unwrap();
    }
    let lock = WorkflowLock::acquire(&store, 1, Duration::from_millis(50), false);
    assert!(lock.is_ok());
}

#[test]
fn acquire_times_out_with_locked_workflow_error_when_contended() {
    let store = InMemoryStore::new();
    store.insert_one_workflow(make_workflow(1)).unwrap();
    let _held = WorkflowLock::acquire(&store, 1, Duration::from_millis(50), false).unwrap();

    let err = WorkflowLock::acquire(&store, 1, Duration::from_millis(100), false).unwrap_err();
    assert!(matches!(err, LaunchPadError::LockedWorkflow { fw_id: 1 }));
}

#[test]
fn acquire_with_kill_forces_the_lock_past_deadline() {
    let store = InMemoryStore::new();
    store.insert_one_workflow(make_workflow(1)).unwrap();
    let held = WorkflowLock::acquire(&store, 1, Duration::from_millis(50), false).unwrap();
    std::mem::forget(held); // simulate a crashed holder that never releases

    let lock = WorkflowLock::acquire(&store, 1, Duration::from_millis(100), true);
    assert!(lock.is_ok());
}

#[test]
fn contended_lock_is_exclusive_across_threads() {
    let store = Arc::new(InMemoryStore::new());
    store.insert_one_workflow(make_workflow(1)).unwrap();

    let holder = WorkflowLock::acquire(&*store, 1, Duration::from_millis(50), false).unwrap();

    let store2 = Arc::clone(&store);
    let handle = std::thread::spawn(move || {
        WorkflowLock::acquire(&*store2, 1, Duration::from_millis(100), false).map(|_| ())
    });

    std::thread::sleep(Duration::from_millis(20));
    drop(holder);

    assert!(handle.join().unwrap().is_ok());
}
