// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Firework and FWAction: the in-memory unit of work.

use crate::id::{FireworkId, LaunchIdx};
use crate::state::{FwState, StateHistoryEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Result payload a worker submits at checkin.
///
/// `action` bodies are arbitrary JSON bags produced by firetasks, which are
/// opaque to this crate except for the handful of reserved operators named
/// here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FWAction {
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub update_spec: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mod_spec: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additions: Vec<Firework>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub detours: Vec<Firework>,
    #[serde(default)]
    pub defuse_children: bool,
    #[serde(default)]
    pub defuse_workflow: bool,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub stored_data: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub exit: bool,
}

impl FWAction {
    pub fn is_empty(&self) -> bool {
        self == &FWAction::default()
    }
}

/// Inline action storage: either the action body itself, or a pointer to
/// where it was spilled when it exceeded the store's document limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionSlot {
    Inline(FWAction),
    Spillover { spillover_id: String },
}

impl Default for ActionSlot {
    fn default() -> Self {
        ActionSlot::Inline(FWAction::default())
    }
}

/// A single unit of work: one node of a Workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Firework {
    pub fw_id: FireworkId,
    pub launch_idx: LaunchIdx,
    pub name: String,
    #[serde(default)]
    pub spec: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub tasks: Vec<serde_json::Value>,
    pub state: FwState,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
    #[serde(default)]
    pub state_history: Vec<StateHistoryEntry>,
    #[serde(default)]
    pub trackers: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_dir: Option<String>,
    #[serde(default)]
    pub action: ActionSlot,
    #[serde(default)]
    pub duplicates: BTreeSet<i64>,
}

impl Firework {
    /// A fresh Firework with a placeholder id (rewritten by the
    /// [`IdAssigner`](crate) on insert) in state `WAITING`.
    pub fn new(name: impl Into<String>, spec: serde_json::Map<String, serde_json::Value>, now: DateTime<Utc>) -> Self {
        Self {
            fw_id: FireworkId::new(-1),
            launch_idx: LaunchIdx::FIRST,
            name: name.into(),
            spec,
            tasks: Vec::new(),
            state: FwState::Waiting,
            created_on: now,
            updated_on: now,
            state_history: vec![StateHistoryEntry::new(FwState::Waiting, now)],
            trackers: Vec::new(),
            launch_dir: None,
            action: ActionSlot::default(),
            duplicates: BTreeSet::new(),
        }
    }

    pub fn priority(&self) -> i64 {
        self.spec
            .get("_priority")
            .and_then(|v| v.as_i64())
            .unwrap_or(0)
    }

    pub fn set_priority(&mut self, priority: i64) {
        self.spec
            .insert("_priority".to_string(), serde_json::json!(priority));
    }

    pub fn category(&self) -> Option<&str> {
        self.spec.get("_category").and_then(|v| v.as_str())
    }

    /// Transition to `next`, appending a state-history entry.
    ///
    /// Returns an error if `self.state -> next` is not in the transition
    /// table; callers that need to force an operator override
    /// (DEFUSED/PAUSED) get `Ok` unconditionally since those are always
    /// legal.
    pub fn transition(
        &mut self,
        next: FwState,
        now: DateTime<Utc>,
    ) -> Result<(), crate::error::CoreError> {
        if !self.state.can_transition_to(next) {
            return Err(crate::error::CoreError::IllegalTransition {
                fw_id: self.fw_id,
                from: self.state,
                to: next,
            });
        }
        if next == FwState::Completed || next == FwState::Fizzled {
            if self.state != FwState::Running {
                return Err(crate::error::CoreError::IllegalTransition {
                    fw_id: self.fw_id,
                    from: self.state,
                    to: next,
                });
            }
        }
        self.state = next;
        self.updated_on = now;
        self.state_history.push(StateHistoryEntry::new(next, now));
        Ok(())
    }

    /// Record a reservation, stamping the RESERVED history entry with the
    /// caller-issued reservation id.
    pub fn reserve(
        &mut self,
        reservation_id: crate::id::ReservationId,
        now: DateTime<Utc>,
    ) -> Result<(), crate::error::CoreError> {
        self.transition(FwState::Reserved, now)?;
        if let Some(entry) = self.state_history.last_mut() {
            entry.reservation_id = Some(reservation_id);
        }
        Ok(())
    }

    /// Start a new attempt: bump `launch_idx`, reset transient launch state,
    /// and leave `state` at READY (a subsequent reserve yields a strictly
    /// greater `launch_idx`).
    pub fn rerun(&mut self, now: DateTime<Utc>) -> Result<(), crate::error::CoreError> {
        if !matches!(self.state, FwState::Completed | FwState::Fizzled) {
            return Err(crate::error::CoreError::IllegalTransition {
                fw_id: self.fw_id,
                from: self.state,
                to: FwState::Ready,
            });
        }
        self.launch_idx = self.launch_idx.next();
        self.state = FwState::Ready;
        self.updated_on = now;
        self.launch_dir = None;
        self.action = ActionSlot::default();
        self.state_history.push(StateHistoryEntry::new(FwState::Ready, now));
        Ok(())
    }

    /// The `updated_on` of the most recent history entry in `state`, if any
    /// (used by the Janitor to detect stale reservations).
    pub fn last_entry_for(&self, state: FwState) -> Option<&StateHistoryEntry> {
        self.state_history.iter().rev().find(|e| e.state == state)
    }

    /// Append a monitoring tick to `trackers`, recording that a worker
    /// observed this firework alive as of `now`. Distinct from
    /// `state_history`: a RUNNING firework with no recent tick is a lost
    /// run, independent of when it last changed state.
    pub fn record_tracker_tick(&mut self, now: DateTime<Utc>) {
        self.trackers.push(serde_json::json!({ "updated_on": now.to_rfc3339() }));
    }

    /// The timestamp of the most recent tracker tick, if any (used by the
    /// Janitor to detect lost runs).
    pub fn last_tracker_tick(&self) -> Option<DateTime<Utc>> {
        self.trackers.iter().rev().find_map(|t| {
            let raw = t.get("updated_on")?.as_str()?;
            DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&Utc))
        })
    }

    pub fn add_duplicate(&mut self, other: FireworkId) {
        self.duplicates.insert(other.get());
    }

    /// Deduplicated set of `fw_id`s this firework is linked to as a
    /// duplicate, excluding itself.
    pub fn duplicate_ids(&self) -> Vec<FireworkId> {
        self.duplicates
            .iter()
            .copied()
            .filter(|id| *id != self.fw_id.get())
            .map(FireworkId::new)
            .collect()
    }
}

#[cfg(test)]
#[path = "firework_tests.rs"]
mod tests;
