// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background maintenance: reclaim stale reservations and runs, and keep
//! the store's indexes current.

use crate::error::LaunchPadError;
use crate::workflow_refresh::refresh_workflow;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use launchpad_core::{FwState, Query};
use launchpad_storage::{FwUpdateOp, Store, TuneupResult};
use std::time::Duration;

pub struct Janitor<'a> {
    store: &'a dyn Store,
}

impl<'a> Janitor<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Find fireworks stuck in RESERVED past `expiry`. If `rerun` is set,
    /// cancel the reservation (RESERVED -> READY) and refresh the owning
    /// workflow. Returns the affected `fw_id`s either way.
    pub fn detect_unreserved(
        &self,
        expiry: Duration,
        rerun: bool,
        wflock_expire: Duration,
        wflock_kill: bool,
    ) -> Result<Vec<i64>, LaunchPadError> {
        let cutoff = Utc::now() - chrono_duration(expiry);
        let stale = self.stale_fireworks(FwState::Reserved, cutoff)?;

        if rerun {
            for fw_id in &stale {
                self.store.find_one_and_update_firework(
                    &Query::new().eq("fw_id", *fw_id).eq("state", "RESERVED"),
                    None,
                    FwUpdateOp::SetState { state: FwState::Ready, updated_on: Utc::now() },
                )?;
                refresh_workflow(self.store, *fw_id, FwState::Ready, wflock_expire, wflock_kill)?;
            }
        }

        Ok(stale)
    }

    /// Find fireworks stuck in RUNNING whose last tracker tick predates
    /// `expiry`. Marks them FIZZLED and refreshes the owning workflow.
    pub fn detect_lost_runs(
        &self,
        expiry: Duration,
        wflock_expire: Duration,
        wflock_kill: bool,
    ) -> Result<Vec<i64>, LaunchPadError> {
        let cutoff = Utc::now() - chrono_duration(expiry);
        let stale = self.stale_running_fireworks(cutoff)?;

        for fw_id in &stale {
            self.store.find_one_and_update_firework(
                &Query::new().eq("fw_id", *fw_id).eq("state", "RUNNING"),
                None,
                FwUpdateOp::SetState { state: FwState::Fizzled, updated_on: Utc::now() },
            )?;
            refresh_workflow(self.store, *fw_id, FwState::Fizzled, wflock_expire, wflock_kill)?;
        }

        Ok(stale)
    }

    pub fn tuneup(&self, background: bool) -> TuneupResult {
        self.store.tuneup(background)
    }

    fn stale_fireworks(&self, state: FwState, cutoff: DateTime<Utc>) -> Result<Vec<i64>, LaunchPadError> {
        let candidates = self.store.find_fireworks(&Query::new().eq("state", state.to_string()), None, None)?;
        Ok(candidates
            .into_iter()
            .filter(|fw| {
                fw.last_entry_for(state)
                    .map(|entry| entry.updated_on <= cutoff)
                    .unwrap_or(false)
            })
            .map(|fw| fw.fw_id.get())
            .collect())
    }

    /// RUNNING fireworks whose last tracker tick predates `cutoff`. Falls
    /// back to the RUNNING `state_history` entry for a run that has never
    /// ticked yet, so a run abandoned before its first checkin is still
    /// caught.
    fn stale_running_fireworks(&self, cutoff: DateTime<Utc>) -> Result<Vec<i64>, LaunchPadError> {
        let candidates =
            self.store.find_fireworks(&Query::new().eq("state", FwState::Running.to_string()), None, None)?;
        Ok(candidates
            .into_iter()
            .filter(|fw| {
                let last_tick = fw
                    .last_tracker_tick()
                    .or_else(|| fw.last_entry_for(FwState::Running).map(|entry| entry.updated_on));
                last_tick.map(|tick| tick <= cutoff).unwrap_or(false)
            })
            .map(|fw| fw.fw_id.get())
            .collect())
    }
}

fn chrono_duration(d: Duration) -> ChronoDuration {
    ChronoDuration::from_std(d).unwrap_or(ChronoDuration::zero())
}

#[cfg(test)]
#[path = "janitor_tests.rs"]
mod tests;
