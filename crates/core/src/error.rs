// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Core-level errors: illegal state transitions and malformed DAGs.
//!
//! Store/lock/checkin errors (`NotFound`, `LockedWorkflow`,
//! `DocumentTooLarge`, `DuplicateKey`, `InternalRefresh`, `ConfigError`) live
//! in `launchpad-engine`, which is the layer that talks to the store
//! adapter; this crate only models invariant violations over the in-memory
//! data model.

use crate::id::FireworkId;
use crate::state::FwState;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("firework {fw_id}: illegal transition {from} -> {to}")]
    IllegalTransition {
        fw_id: FireworkId,
        from: FwState,
        to: FwState,
    },

    #[error("workflow links are not a DAG over its nodes: {reason}")]
    NotADag { reason: String },

    #[error("fw_id {fw_id} referenced by links but absent from nodes")]
    DanglingNode { fw_id: FireworkId },
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
