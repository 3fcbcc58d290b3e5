// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn firework_unique_index_is_compound_on_fw_id_and_launch_idx() {
    let specs = required_firework_indexes();
    let unique = specs.iter().find(|s| s.unique).expect("one unique index");
    let keys: Vec<&str> = unique.keys.iter().map(|(k, _)| *k).collect();
    assert_eq!(keys, vec!["fw_id", "launch_idx"]);
}

#[test]
fn only_one_unique_index_on_fireworks() {
    let specs = required_firework_indexes();
    assert_eq!(specs.iter().filter(|s| s.unique).count(), 1);
}

#[test]
fn workflow_indexes_cover_required_fields() {
    let specs = required_workflow_indexes();
    let names: Vec<&str> = specs.iter().map(|s| s.name).collect();
    assert!(names.contains(&"wf_name"));
    assert!(names.contains(&"wf_nodes"));
    assert!(names.contains(&"wf_created_on"));
    assert!(names.contains(&"wf_updated_on"));
}

#[test]
fn tuneup_is_idempotent() {
    let registry = IndexRegistry::new();
    let first = registry.tuneup(true);
    assert!(!first.created.is_empty());
    assert!(first.already_present.is_empty());

    let second = registry.tuneup(true);
    assert!(second.created.is_empty());
    assert_eq!(second.already_present.len(), first.created.len());
}

#[test]
fn tuneup_foreground_requests_compact() {
    let registry = IndexRegistry::new();
    let result = registry.tuneup(false);
    assert!(result.compacted);
}

#[test]
fn tuneup_background_skips_compact() {
    let registry = IndexRegistry::new();
    let result = registry.tuneup(true);
    assert!(!result.compacted);
}

#[test]
fn dispatch_sort_orders_priority_then_launch_idx_then_created_on() {
    let fifo = dispatch_sort(true);
    assert_eq!(fifo.fields[0], ("spec._priority".to_string(), SortDir::Desc));
    assert_eq!(fifo.fields[1], ("launch_idx".to_string(), SortDir::Desc));
    assert_eq!(fifo.fields[2], ("created_on".to_string(), SortDir::Asc));

    let filo = dispatch_sort(false);
    assert_eq!(filo.fields[2], ("created_on".to_string(), SortDir::Desc));
}
