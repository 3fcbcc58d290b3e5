// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `_refresh_wf`: recompute a workflow's aggregate state after one of its
//! nodes changes, promote newly-unblocked WAITING nodes to READY, and
//! persist the result under the workflow lock.
//!
//! Any failure partway through is treated as unrecoverable for the affected
//! firework and its workflow: both are marked FIZZLED and the triggering
//! error is wrapped, rather than left in a half-refreshed state.

use crate::error::LaunchPadError;
use crate::lock::WorkflowLock;
use chrono::Utc;
use launchpad_core::{FireworkId, FwState};
use launchpad_storage::{FwUpdateOp, Store};
use std::time::Duration;

/// Recompute and persist the workflow containing `fw_id` after `fw_id`'s
/// firework settled into `new_state`.
pub fn refresh_workflow(
    store: &dyn Store,
    fw_id: i64,
    new_state: FwState,
    wflock_expire: Duration,
    wflock_kill: bool,
) -> Result<(), LaunchPadError> {
    let lock = WorkflowLock::acquire(store, fw_id, wflock_expire, wflock_kill)?;
    match try_refresh(store, fw_id, new_state) {
        Ok(()) => {
            drop(lock);
            Ok(())
        }
        Err(err) => {
            fizzle_on_refresh_failure(store, fw_id, &err);
            drop(lock);
            Err(err)
        }
    }
}

fn try_refresh(store: &dyn Store, fw_id: i64, new_state: FwState) -> Result<(), LaunchPadError> {
    let mut workflow = store
        .get_workflow(fw_id)?
        .ok_or(LaunchPadError::NotFound { fw_id })?;

    let now = Utc::now();
    workflow.refresh_node(FireworkId::new(fw_id), new_state, now);

    for ready_id in workflow.newly_ready_nodes() {
        store.find_one_and_update_firework(
            &launchpad_core::Query::new().eq("fw_id", ready_id.get()).eq("state", "WAITING"),
            None,
            FwUpdateOp::SetState { state: FwState::Ready, updated_on: now },
        )?;
        workflow.refresh_node(ready_id, FwState::Ready, now);
    }

    store.find_one_and_replace_workflow(workflow)?;
    Ok(())
}

/// Force both the firework and its workflow into FIZZLED. This bypasses the
/// normal transition table (which only allows RUNNING -> FIZZLED): a
/// refresh failure is an exceptional, operator-grade override, not a
/// business-rule transition.
fn fizzle_on_refresh_failure(store: &dyn Store, fw_id: i64, err: &LaunchPadError) {
    let now = Utc::now();

    if let Ok(Some(mut fw)) = store.get_firework(fw_id) {
        fw.state = FwState::Fizzled;
        fw.updated_on = now;
        fw.state_history.push(launchpad_core::StateHistoryEntry::new(FwState::Fizzled, now));
        let _ = store.find_one_and_replace_firework(fw);
    }
    if let Ok(Some(mut workflow)) = store.get_workflow(fw_id) {
        workflow.refresh_node(FireworkId::new(fw_id), FwState::Fizzled, now);
        let _ = store.find_one_and_replace_workflow(workflow);
    }
    tracing::error!(fw_id, %err, "workflow refresh failed, fizzling affected node");
}

#[cfg(test)]
#[path = "workflow_refresh_tests.rs"]
mod tests;
