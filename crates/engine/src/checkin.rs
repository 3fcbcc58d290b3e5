// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `checkin`: ingest a worker's result, persisting the firework and
//! propagating the change to its workflow and any duplicates.

use crate::error::LaunchPadError;
use crate::workflow_refresh::refresh_workflow;
use chrono::Utc;
use launchpad_core::{ActionSlot, FWAction, Firework, FwState};
use launchpad_storage::{BlobMetadata, Store, StoreError};
use std::time::Duration;

/// Apply `action`, transition to `state`, and persist, spilling the action
/// to the blob store if the replaced document exceeds the store's size
/// limit. Refreshes the firework's workflow and every workflow containing a
/// duplicate of this firework.
pub fn checkin(
    store: &dyn Store,
    mut firework: Firework,
    action: FWAction,
    state: FwState,
    wflock_expire: Duration,
    wflock_kill: bool,
) -> Result<Firework, LaunchPadError> {
    let now = Utc::now();
    let spilled_action = action.clone();
    firework.action = ActionSlot::Inline(action);
    firework.record_tracker_tick(now);
    firework.transition(state, now)?;

    match store.find_one_and_replace_firework(firework.clone()) {
        Ok(()) => {}
        Err(StoreError::DocumentTooLarge { size_bytes }) => {
            if spilled_action.is_empty() {
                return Err(LaunchPadError::DocumentTooLarge { fw_id: firework.fw_id.get(), size_bytes });
            }
            let Some(blob) = store.blob_store() else {
                return Err(LaunchPadError::Store(StoreError::BlobStoreNotConfigured));
            };
            let bytes = serde_json::to_vec(&spilled_action).map_err(|e| LaunchPadError::InternalRefresh {
                fw_id: firework.fw_id.get(),
                message: format!("failed to serialize spilled action: {e}"),
            })?;
            let spillover_id = blob
                .put(
                    &bytes,
                    BlobMetadata { fw_id: firework.fw_id.get(), launch_idx: firework.launch_idx.get() },
                )
                .map_err(|e| LaunchPadError::InternalRefresh {
                    fw_id: firework.fw_id.get(),
                    message: format!("blob spillover failed: {e}"),
                })?;
            firework.action = ActionSlot::Spillover { spillover_id };
            store.find_one_and_replace_firework(firework.clone())?;
        }
        Err(other) => return Err(other.into()),
    }

    refresh_workflow(store, firework.fw_id.get(), state, wflock_expire, wflock_kill)?;

    for dup_id in firework.duplicate_ids() {
        refresh_workflow(store, dup_id.get(), state, wflock_expire, wflock_kill)?;
    }

    Ok(firework)
}

#[cfg(test)]
#[path = "checkin_tests.rs"]
mod tests;
