// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn spec(input_path: &str) -> serde_json::Map<String, serde_json::Value> {
    let mut m = serde_json::Map::new();
    m.insert("input_path".to_string(), serde_json::json!(input_path));
    m.insert("_priority".to_string(), serde_json::json!(5));
    m
}

#[test]
fn exact_spec_dupefinder_name() {
    assert_eq!(ExactSpecDupeFinder.name(), "exact_spec");
}

#[test]
fn exact_spec_verify_true_on_matching_non_reserved_keys() {
    let finder = ExactSpecDupeFinder;
    let a = spec("/data/in.csv");
    let mut b = spec("/data/in.csv");
    b.insert("_priority".to_string(), serde_json::json!(99));
    assert_eq!(finder.verify(&a, &b), Some(true));
}

#[test]
fn exact_spec_verify_false_on_differing_keys() {
    let finder = ExactSpecDupeFinder;
    let a = spec("/data/in.csv");
    let b = spec("/data/other.csv");
    assert_eq!(finder.verify(&a, &b), Some(false));
}

#[test]
fn exact_spec_query_skips_reserved_keys() {
    let finder = ExactSpecDupeFinder;
    let q = finder.query(&spec("/data/in.csv"));
    assert!(q.conditions.contains_key("spec.input_path"));
    assert!(!q.conditions.contains_key("spec._priority"));
}

#[test]
fn registry_round_trips_by_name() {
    let mut registry = DupeFinderRegistry::new();
    registry.register(std::sync::Arc::new(ExactSpecDupeFinder));
    let found = registry.get("exact_spec");
    assert!(found.is_some());
    assert_eq!(found.unwrap().name(), "exact_spec");
}

#[test]
fn registry_returns_none_for_unknown_name() {
    let registry = DupeFinderRegistry::new();
    assert!(registry.get("nope").is_none());
}
