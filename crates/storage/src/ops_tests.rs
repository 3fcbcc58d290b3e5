// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn store_op_serde_roundtrip_incr_counter() {
    let op = StoreOp::IncrCounter { amount: 5 };
    let json = serde_json::to_string(&op).unwrap();
    let back: StoreOp = serde_json::from_str(&json).unwrap();
    assert!(matches!(back, StoreOp::IncrCounter { amount: 5 }));
}

#[test]
fn store_op_serde_roundtrip_shutdown() {
    let op = StoreOp::Shutdown;
    let json = serde_json::to_string(&op).unwrap();
    let back: StoreOp = serde_json::from_str(&json).unwrap();
    assert!(matches!(back, StoreOp::Shutdown));
}

#[test]
fn store_op_serde_roundtrip_delete_fireworks() {
    let op = StoreOp::DeleteFireworks(vec![1, 2, 3]);
    let json = serde_json::to_string(&op).unwrap();
    let back: StoreOp = serde_json::from_str(&json).unwrap();
    match back {
        StoreOp::DeleteFireworks(ids) => assert_eq!(ids, vec![1, 2, 3]),
        _ => panic!("wrong variant"),
    }
}
