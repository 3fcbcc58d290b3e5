// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::ops::StoreOp;
use chrono::Utc;
use launchpad_core::{Firework, FireworkId};
use std::fs::{self, File};
use std::io::Write;
use tempfile::tempdir;

fn create_test_state(num_fireworks: usize) -> StoreState {
    let mut state = StoreState::new();
    for i in 0..num_fireworks {
        let mut fw = Firework::new(&format!("task-{i}"), serde_json::Map::new(), Utc::now());
        fw.fw_id = FireworkId::new(i as i64 + 1);
        state.apply(&StoreOp::InsertFirework(Box::new(fw)));
    }
    state
}

#[test]
fn test_snapshot_save_and_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapshot.json");

    let state = create_test_state(3);
    let snapshot = Snapshot::new(42, state);

    snapshot.save(&path).unwrap();
    assert!(path.exists());

    let loaded = Snapshot::load(&path).unwrap().unwrap();
    assert_eq!(loaded.seq, 42);
    assert_eq!(loaded.state.fireworks.len(), 3);
    assert_eq!(loaded.version, CURRENT_SNAPSHOT_VERSION);
}

#[test]
fn test_load_nonexistent() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nonexistent.json");

    let result = Snapshot::load(&path).unwrap();
    assert!(result.is_none());
}

#[test]
fn test_snapshot_atomic_write() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapshot.json");
    let tmp_path = path.with_extension("tmp");

    let state = create_test_state(1);
    let snapshot = Snapshot::new(1, state);

    snapshot.save(&path).unwrap();

    assert!(!tmp_path.exists());
    assert!(path.exists());
}

#[test]
fn test_snapshot_preserves_state() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapshot.json");

    let state = create_test_state(3);
    let snapshot = Snapshot::new(100, state);
    snapshot.save(&path).unwrap();

    let loaded = Snapshot::load(&path).unwrap().unwrap();
    assert_eq!(loaded.seq, 100);
    assert_eq!(loaded.state.fireworks.len(), 3);
    assert!(loaded.state.latest_firework(1).is_some());
    assert!(loaded.state.latest_firework(3).is_some());
}

#[test]
fn test_load_corrupt_snapshot_returns_none_and_creates_bak() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapshot.json");

    let mut f = File::create(&path).unwrap();
    f.write_all(b"\xe5\x03\x01binary-garbage").unwrap();
    drop(f);

    let result = Snapshot::load(&path).unwrap();
    assert!(result.is_none());

    assert!(!path.exists());
    let bak = path.with_extension("bak");
    assert!(bak.exists());
}

#[test]
fn test_load_corrupt_snapshot_rotates_bak_files() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapshot.json");

    for i in 1..=4u8 {
        let mut f = File::create(&path).unwrap();
        f.write_all(&[i; 4]).unwrap();
        drop(f);

        let result = Snapshot::load(&path).unwrap();
        assert!(result.is_none());
    }

    let bak1 = path.with_extension("bak");
    assert!(bak1.exists());
    assert_eq!(fs::read(&bak1).unwrap(), vec![4u8; 4]);

    let bak2 = path.with_extension("bak.2");
    assert!(bak2.exists());
    assert_eq!(fs::read(&bak2).unwrap(), vec![3u8; 4]);

    let bak3 = path.with_extension("bak.3");
    assert!(bak3.exists());
    assert_eq!(fs::read(&bak3).unwrap(), vec![2u8; 4]);

    let bak4 = path.with_extension("bak.4");
    assert!(!bak4.exists());
}

#[test]
fn test_snapshot_round_trip_with_state_history() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapshot.json");

    let mut state = StoreState::new();
    let now = Utc::now();
    let mut fw = Firework::new("task", serde_json::Map::new(), now);
    fw.fw_id = FireworkId::new(1);
    fw.transition(launchpad_core::FwState::Ready, now).unwrap();
    state.apply(&StoreOp::InsertFirework(Box::new(fw)));

    let snapshot = Snapshot::new(50, state);
    snapshot.save(&path).unwrap();

    let loaded = Snapshot::load(&path).unwrap().unwrap();
    assert_eq!(loaded.seq, 50);

    let fw = loaded.state.latest_firework(1).unwrap();
    assert_eq!(fw.state, launchpad_core::FwState::Ready);
    assert_eq!(fw.state_history.len(), 2);
}
