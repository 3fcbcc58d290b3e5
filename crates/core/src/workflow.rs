// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow: a DAG of fireworks with a cached, computed aggregate state.

use crate::error::CoreError;
use crate::id::FireworkId;
use crate::state::FwState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// A named DAG of fireworks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub nodes: BTreeSet<i64>,
    pub links: BTreeMap<i64, Vec<i64>>,
    pub name: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
    pub fw_states: BTreeMap<i64, FwState>,
    pub state: FwState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
}

impl Workflow {
    /// Build a new workflow over `nodes`/`links`, validating the DAG
    /// invariant and computing the initial aggregate state from
    /// `fw_states`.
    pub fn new(
        name: impl Into<String>,
        nodes: BTreeSet<i64>,
        links: BTreeMap<i64, Vec<i64>>,
        fw_states: BTreeMap<i64, FwState>,
        metadata: serde_json::Map<String, serde_json::Value>,
        now: DateTime<Utc>,
    ) -> Result<Self, CoreError> {
        validate_dag(&nodes, &links)?;
        let state = aggregate_state(&fw_states);
        Ok(Self {
            nodes,
            links,
            name: name.into(),
            metadata,
            created_on: now,
            updated_on: now,
            fw_states,
            state,
            locked: None,
        })
    }

    pub fn is_locked(&self) -> bool {
        self.locked.unwrap_or(false)
    }

    pub fn children_of(&self, fw_id: FireworkId) -> &[i64] {
        self.links
            .get(&fw_id.get())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn parents_of(&self, fw_id: FireworkId) -> Vec<FireworkId> {
        self.links
            .iter()
            .filter(|(_, children)| children.contains(&fw_id.get()))
            .map(|(parent, _)| FireworkId::new(*parent))
            .collect()
    }

    /// Recompute `fw_states` entry for `fw_id` and the workflow's aggregate
    /// `state`. Callers are responsible for holding the workflow lock.
    pub fn refresh_node(&mut self, fw_id: FireworkId, new_state: FwState, now: DateTime<Utc>) {
        self.fw_states.insert(fw_id.get(), new_state);
        self.state = aggregate_state(&self.fw_states);
        self.updated_on = now;
    }

    /// All nodes whose parents are all `COMPLETED` and who are not
    /// themselves already past `WAITING` (used to drive WAITING -> READY
    /// transitions after a checkin).
    pub fn newly_ready_nodes(&self) -> Vec<FireworkId> {
        let mut parents_of: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
        for (parent, children) in &self.links {
            for child in children {
                parents_of.entry(*child).or_default().push(*parent);
            }
        }
        self.nodes
            .iter()
            .filter(|fw_id| self.fw_states.get(fw_id) == Some(&FwState::Waiting))
            .filter(|fw_id| {
                parents_of
                    .get(fw_id)
                    .map(|parents| {
                        parents
                            .iter()
                            .all(|p| self.fw_states.get(p) == Some(&FwState::Completed))
                    })
                    .unwrap_or(true)
            })
            .map(|fw_id| FireworkId::new(*fw_id))
            .collect()
    }

    /// Whether `fw_id` still has a ready path to completion: a FIZZLED
    /// terminal node only dooms the workflow if none of its siblings can
    /// still reach COMPLETED.
    pub fn has_unrecoverable_fizzle(&self) -> bool {
        self.fw_states.iter().any(|(fw_id, state)| {
            *state == FwState::Fizzled && !self.has_ready_path_to_completion(*fw_id)
        })
    }

    fn has_ready_path_to_completion(&self, _fw_id: i64) -> bool {
        self.fw_states
            .values()
            .any(|s| matches!(s, FwState::Ready | FwState::Running | FwState::Waiting))
    }
}

/// `COMPLETED` iff all nodes COMPLETED; `FIZZLED` iff any terminal FIZZLED
/// and no ready path to completion; `RUNNING` iff any node RUNNING; `READY`
/// iff any node READY and none RUNNING; else `WAITING`.
pub fn aggregate_state(fw_states: &BTreeMap<i64, FwState>) -> FwState {
    if fw_states.is_empty() {
        return FwState::Waiting;
    }
    if fw_states.values().all(|s| *s == FwState::Completed) {
        return FwState::Completed;
    }
    let any_fizzled = fw_states.values().any(|s| *s == FwState::Fizzled);
    let any_recoverable =
        fw_states.values().any(|s| matches!(s, FwState::Ready | FwState::Running | FwState::Waiting));
    if any_fizzled && !any_recoverable {
        return FwState::Fizzled;
    }
    if fw_states.values().any(|s| *s == FwState::Running) {
        return FwState::Running;
    }
    if fw_states.values().any(|s| *s == FwState::Ready) {
        return FwState::Ready;
    }
    FwState::Waiting
}

/// Validates that `links` forms a DAG over `nodes`: every referenced id is
/// a node, and there is no cycle.
fn validate_dag(nodes: &BTreeSet<i64>, links: &BTreeMap<i64, Vec<i64>>) -> Result<(), CoreError> {
    for (parent, children) in links {
        if !nodes.contains(parent) {
            return Err(CoreError::DanglingNode {
                fw_id: FireworkId::new(*parent),
            });
        }
        for child in children {
            if !nodes.contains(child) {
                return Err(CoreError::DanglingNode {
                    fw_id: FireworkId::new(*child),
                });
            }
        }
    }

    let mut indegree: BTreeMap<i64, usize> = nodes.iter().map(|n| (*n, 0)).collect();
    for children in links.values() {
        for child in children {
            *indegree.entry(*child).or_insert(0) += 1;
        }
    }
    let mut queue: VecDeque<i64> = indegree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(n, _)| *n)
        .collect();
    let mut visited = 0usize;
    while let Some(n) = queue.pop_front() {
        visited += 1;
        if let Some(children) = links.get(&n) {
            for child in children {
                // every child was seeded into indegree from `nodes` above, and the
                // dangling-reference check already rejected any id outside `nodes`
                #[allow(clippy::expect_used)]
                let d = indegree.get_mut(child).expect("validated above");
                *d -= 1;
                if *d == 0 {
                    queue.push_back(*child);
                }
            }
        }
    }
    if visited != nodes.len() {
        return Err(CoreError::NotADag {
            reason: "cycle detected among workflow nodes".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
