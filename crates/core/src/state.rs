// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Firework/Workflow state and the state transition DAG.

use crate::id::ReservationId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state shared by both a Firework and its enclosing Workflow's
/// aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FwState {
    Waiting,
    Ready,
    Reserved,
    Running,
    Completed,
    Fizzled,
    Defused,
    Paused,
    Archived,
}

impl FwState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FwState::Completed | FwState::Fizzled | FwState::Archived)
    }

    /// Whether `self -> next` is a legal transition.
    ///
    /// `DEFUSED` and `PAUSED` are reachable from any state (operator
    /// intervention); `PAUSED -> prior` is handled by the caller restoring
    /// whatever state preceded the pause, not by this table.
    pub fn can_transition_to(&self, next: FwState) -> bool {
        use FwState::*;
        match (*self, next) {
            (_, Defused) | (_, Paused) => true,
            (Waiting, Ready) => true,
            (Ready, Reserved) => true,
            (Reserved, Running) => true,
            (Reserved, Ready) => true,
            (Running, Completed) => true,
            (Running, Fizzled) => true,
            (Completed, Ready) | (Fizzled, Ready) => true,
            (Paused, _) => true,
            (a, b) if a == b => true,
            _ => false,
        }
    }
}

impl fmt::Display for FwState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FwState::Waiting => "WAITING",
            FwState::Ready => "READY",
            FwState::Reserved => "RESERVED",
            FwState::Running => "RUNNING",
            FwState::Completed => "COMPLETED",
            FwState::Fizzled => "FIZZLED",
            FwState::Defused => "DEFUSED",
            FwState::Paused => "PAUSED",
            FwState::Archived => "ARCHIVED",
        };
        write!(f, "{}", s)
    }
}

/// One entry in a Firework's `state_history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateHistoryEntry {
    pub state: FwState,
    pub updated_on: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservation_id: Option<ReservationId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<serde_json::Value>,
}

impl StateHistoryEntry {
    pub fn new(state: FwState, updated_on: DateTime<Utc>) -> Self {
        Self {
            state,
            updated_on,
            reservation_id: None,
            checkpoint: None,
        }
    }

    pub fn with_reservation_id(mut self, id: ReservationId) -> Self {
        self.reservation_id = Some(id);
        self
    }

    pub fn with_checkpoint(mut self, checkpoint: serde_json::Value) -> Self {
        self.checkpoint = Some(checkpoint);
        self
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
