// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The cooperative workflow mutex: a compare-and-set lock keyed by any node
//! of the target workflow, backed by [`Store::try_lock_workflow`].
//!
//! The lock has no TTL in the store itself, so a crashed holder is only
//! recovered by the `kill` fallback once `expire` elapses.

use crate::error::LaunchPadError;
use launchpad_storage::Store;
use std::time::{Duration, Instant};
use tracing::warn;

/// A held workflow lock. Releases on drop.
pub struct WorkflowLock<'a> {
    store: &'a dyn Store,
    fw_id: i64,
}

impl<'a> WorkflowLock<'a> {
    /// Acquire the lock on the workflow containing `fw_id`, retrying with
    /// backoff until `expire` elapses. If `kill` is set, forcibly take the
    /// lock past the deadline with a warning rather than fail.
    pub fn acquire(
        store: &'a dyn Store,
        fw_id: i64,
        expire: Duration,
        kill: bool,
    ) -> Result<Self, LaunchPadError> {
        let deadline = Instant::now() + expire;
        let mut attempt: u64 = 0;

        loop {
            if store.try_lock_workflow(fw_id)? {
                return Ok(Self { store, fw_id });
            }

            let now = Instant::now();
            if now >= deadline {
                if kill {
                    warn!(fw_id, "workflow lock deadline exceeded, forcing acquisition");
                    store.force_lock_workflow(fw_id)?;
                    return Ok(Self { store, fw_id });
                }
                return Err(LaunchPadError::LockedWorkflow { fw_id });
            }

            attempt += 1;
            let nanos = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.subsec_nanos())
                .unwrap_or(0);
            let jitter = Duration::from_millis(u64::from(nanos % 10) * 10);
            let backoff = Duration::from_millis(attempt * 100) + jitter;
            std::thread::sleep(backoff.min(deadline - now));
        }
    }

    pub fn fw_id(&self) -> i64 {
        self.fw_id
    }
}

impl Drop for WorkflowLock<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.store.unlock_workflow(self.fw_id) {
            warn!(fw_id = self.fw_id, %err, "failed to release workflow lock");
        }
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
