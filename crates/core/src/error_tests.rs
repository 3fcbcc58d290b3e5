// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn illegal_transition_message() {
    let err = CoreError::IllegalTransition {
        fw_id: FireworkId::new(7),
        from: FwState::Waiting,
        to: FwState::Running,
    };
    assert_eq!(err.to_string(), "firework 7: illegal transition WAITING -> RUNNING");
}

#[test]
fn not_a_dag_message() {
    let err = CoreError::NotADag {
        reason: "cycle through 1 -> 2 -> 1".to_string(),
    };
    assert!(err.to_string().contains("cycle"));
}

#[test]
fn dangling_node_message() {
    let err = CoreError::DanglingNode {
        fw_id: FireworkId::new(3),
    };
    assert_eq!(err.to_string(), "fw_id 3 referenced by links but absent from nodes");
}
