// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Index contract bookkeeping for the `fireworks`/`workflows` collections.
//!
//! The in-memory store doesn't need real index structures — `BTreeMap`
//! already gives O(log n) lookup and enforces the `(fw_id, launch_idx)`
//! uniqueness invariant structurally — but `tuneup` must still be an
//! idempotent, observable operation so the janitor and callers can reason
//! about "indexes exist" the same way they would against a real store.

use launchpad_core::{Sort, SortDir};
use parking_lot::Mutex;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq)]
pub struct IndexSpec {
    pub name: &'static str,
    pub keys: Vec<(&'static str, SortDir)>,
    pub unique: bool,
}

impl IndexSpec {
    fn new(name: &'static str, keys: &[(&'static str, SortDir)], unique: bool) -> Self {
        Self {
            name,
            keys: keys.to_vec(),
            unique,
        }
    }
}

/// The index set required on the `fireworks` collection.
pub fn required_firework_indexes() -> Vec<IndexSpec> {
    use SortDir::{Asc, Desc};
    vec![
        IndexSpec::new("fw_launch_unique", &[("fw_id", Asc), ("launch_idx", Asc)], true),
        IndexSpec::new("fw_state", &[("state", Asc)], false),
        IndexSpec::new("fw_category", &[("spec._category", Asc)], false),
        IndexSpec::new("fw_created_on", &[("created_on", Asc)], false),
        IndexSpec::new("fw_updated_on", &[("updated_on", Asc)], false),
        IndexSpec::new("fw_name", &[("name", Asc)], false),
        IndexSpec::new(
            "fw_dispatch_fifo",
            &[("state", Desc), ("spec._priority", Desc), ("created_on", Asc)],
            false,
        ),
        IndexSpec::new(
            "fw_dispatch_filo",
            &[("state", Desc), ("spec._priority", Desc), ("created_on", Desc)],
            false,
        ),
    ]
}

/// The index set required on the `workflows` collection.
pub fn required_workflow_indexes() -> Vec<IndexSpec> {
    use SortDir::Asc;
    vec![
        IndexSpec::new("wf_name", &[("name", Asc)], false),
        IndexSpec::new("wf_nodes", &[("nodes", Asc)], false),
        IndexSpec::new("wf_created_on", &[("created_on", Asc)], false),
        IndexSpec::new("wf_updated_on", &[("updated_on", Asc)], false),
    ]
}

/// Dispatch sort order: priority desc, launch_idx desc, then created_on
/// ascending (FIFO) or descending (FILO).
pub fn dispatch_sort(fifo: bool) -> Sort {
    Sort::new()
        .by("spec._priority", SortDir::Desc)
        .by("launch_idx", SortDir::Desc)
        .by("created_on", if fifo { SortDir::Asc } else { SortDir::Desc })
}

#[derive(Debug, Default)]
pub struct TuneupResult {
    pub created: Vec<&'static str>,
    pub already_present: Vec<&'static str>,
    pub compacted: bool,
}

/// Tracks which indexes have been created against this store instance, so
/// `tuneup` is idempotent.
#[derive(Default)]
pub struct IndexRegistry {
    created: Mutex<BTreeSet<&'static str>>,
}

impl IndexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure every required index exists. `background` mirrors the store
    /// adapter's background-build hint; when `false` the caller also wants
    /// a compaction pass issued (modeled here as a flag on the result since
    /// the in-memory store has nothing to physically compact).
    pub fn tuneup(&self, background: bool) -> TuneupResult {
        let mut result = TuneupResult::default();
        let mut created = self.created.lock();

        for spec in required_firework_indexes()
            .into_iter()
            .chain(required_workflow_indexes())
        {
            if created.insert(spec.name) {
                result.created.push(spec.name);
            } else {
                result.already_present.push(spec.name);
            }
        }

        result.compacted = !background;
        result
    }
}

#[cfg(test)]
#[path = "indexes_tests.rs"]
mod tests;
