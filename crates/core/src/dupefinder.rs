// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Duplicate-detection policy objects.
//!
//! A dupefinder is named in a firework's spec under the reserved `_dupefinder`
//! key and resolved through a registry keyed by name, exactly as firetasks
//! are resolved by `_fw_name`: this crate never depends on a concrete
//! dupefinder implementation, only on the trait.

use crate::query::Query;
use std::collections::HashMap;
use std::sync::Arc;

/// A spec-embedded policy that identifies and verifies duplicate fireworks.
pub trait DupeFinder: Send + Sync {
    /// The name stored in a firework's `spec._dupefinder` that selects this
    /// policy out of a [`DupeFinderRegistry`].
    fn name(&self) -> &str;

    /// Build a store filter that narrows down duplicate candidates for the
    /// given spec.
    fn query(&self, spec: &serde_json::Map<String, serde_json::Value>) -> Query;

    /// Confirm whether two candidate specs are actually duplicates. Returns
    /// `None` when verification is not implemented by this policy, in which
    /// case the engine accepts candidates from `query` unconditionally.
    /// Callers detect this by probing `verify` with empty arguments first.
    fn verify(
        &self,
        spec_self: &serde_json::Map<String, serde_json::Value>,
        spec_candidate: &serde_json::Map<String, serde_json::Value>,
    ) -> Option<bool>;
}

/// Exact-spec-match dupefinder: candidates share the same `spec` contents
/// (aside from reserved underscore-prefixed keys), verified unconditionally.
#[derive(Debug, Clone, Default)]
pub struct ExactSpecDupeFinder;

impl DupeFinder for ExactSpecDupeFinder {
    fn name(&self) -> &str {
        "exact_spec"
    }

    fn query(&self, spec: &serde_json::Map<String, serde_json::Value>) -> Query {
        let mut q = Query::new();
        for (k, v) in spec.iter() {
            if !k.starts_with('_') {
                q = q.eq(format!("spec.{k}"), v.clone());
            }
        }
        q
    }

    fn verify(
        &self,
        spec_self: &serde_json::Map<String, serde_json::Value>,
        spec_candidate: &serde_json::Map<String, serde_json::Value>,
    ) -> Option<bool> {
        let strip = |m: &serde_json::Map<String, serde_json::Value>| {
            m.iter()
                .filter(|(k, _)| !k.starts_with('_'))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<serde_json::Map<_, _>>()
        };
        Some(strip(spec_self) == strip(spec_candidate))
    }
}

/// Registry of dupefinder policies keyed by name, resolved from a firework's
/// `spec._dupefinder`.
#[derive(Clone, Default)]
pub struct DupeFinderRegistry {
    finders: HashMap<String, Arc<dyn DupeFinder>>,
}

impl DupeFinderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, finder: Arc<dyn DupeFinder>) {
        self.finders.insert(finder.name().to_string(), finder);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn DupeFinder>> {
        self.finders.get(name).cloned()
    }
}

#[cfg(test)]
#[path = "dupefinder_tests.rs"]
mod tests;
