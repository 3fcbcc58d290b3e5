// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized, in-memory index over fireworks and workflows.
//!
//! `StoreState::apply` folds a [`StoreOp`] into the index. Idempotency
//! requirement: applying the same op twice must leave the state unchanged
//! from the first application (replay after a crash reapplies from the last
//! checkpoint). Concretely this means assignment over mutation: replace
//! wins over insert-then-modify, and `ReplaceFirework`/`ReplaceWorkflow`
//! fully overwrite their slot rather than patch it.

use crate::ops::StoreOp;
use launchpad_core::{Firework, FwState, LaunchIdx, Workflow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The complete materialized state: every `(fw_id, launch_idx)` document,
/// the per-`fw_id` latest launch index, every workflow keyed by its minimal
/// node id, and the global id counter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    pub fireworks: BTreeMap<(i64, i32), Firework>,
    pub latest_launch: BTreeMap<i64, i32>,
    pub workflows: BTreeMap<i64, Workflow>,
    pub next_fw_id: i64,
}

impl StoreState {
    pub fn new() -> Self {
        Self {
            fireworks: BTreeMap::new(),
            latest_launch: BTreeMap::new(),
            workflows: BTreeMap::new(),
            next_fw_id: 1,
        }
    }

    /// Fold one durable op into the state. Must be deterministic and
    /// idempotent-on-replay (see module docs).
    pub fn apply(&mut self, op: &StoreOp) {
        match op {
            StoreOp::InsertFirework(fw) | StoreOp::ReplaceFirework(fw) => {
                self.put_firework((**fw).clone());
            }
            StoreOp::DeleteFireworks(fw_ids) => {
                for fw_id in fw_ids {
                    self.latest_launch.remove(fw_id);
                    self.fireworks.retain(|(id, _), _| id != fw_id);
                }
            }
            StoreOp::InsertWorkflow(wf) | StoreOp::ReplaceWorkflow(wf) => {
                if let Some(key) = wf.nodes.iter().next().copied() {
                    self.workflows.insert(key, (**wf).clone());
                }
            }
            StoreOp::DeleteWorkflows(keys) => {
                for key in keys {
                    self.workflows.remove(key);
                }
            }
            StoreOp::IncrCounter { amount } => {
                self.next_fw_id += amount;
            }
            StoreOp::ResetCounter { value } => {
                self.next_fw_id = *value;
            }
            StoreOp::Shutdown => {}
        }
    }

    fn put_firework(&mut self, fw: Firework) {
        let key = (fw.fw_id.get(), fw.launch_idx.get());
        let entry = self.latest_launch.entry(fw.fw_id.get()).or_insert(fw.launch_idx.get());
        if fw.launch_idx.get() >= *entry {
            *entry = fw.launch_idx.get();
        }
        self.fireworks.insert(key, fw);
    }

    /// Resolve the authoritative (highest-`launch_idx`) document for `fw_id`.
    pub fn latest_firework(&self, fw_id: i64) -> Option<&Firework> {
        let idx = *self.latest_launch.get(&fw_id)?;
        self.fireworks.get(&(fw_id, idx))
    }

    pub fn firework_at(&self, fw_id: i64, launch_idx: LaunchIdx) -> Option<&Firework> {
        if launch_idx.is_latest_sentinel() {
            self.latest_firework(fw_id)
        } else {
            self.fireworks.get(&(fw_id, launch_idx.get()))
        }
    }

    /// The workflow containing `fw_id` in its `nodes`.
    pub fn workflow_containing(&self, fw_id: i64) -> Option<&Workflow> {
        self.workflows.values().find(|wf| wf.nodes.contains(&fw_id))
    }

    pub fn workflow_containing_mut(&mut self, fw_id: i64) -> Option<&mut Workflow> {
        self.workflows.values_mut().find(|wf| wf.nodes.contains(&fw_id))
    }

    /// All nodes currently in state `state`, across every workflow, latest
    /// launch only.
    pub fn fireworks_in_state(&self, state: FwState) -> Vec<&Firework> {
        self.latest_launch
            .keys()
            .filter_map(|fw_id| self.latest_firework(*fw_id))
            .filter(|fw| fw.state == state)
            .collect()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
