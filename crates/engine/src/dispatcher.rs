// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `reserve_ready`: the selection and checkout procedure a worker uses to
//! claim the next unit of work.

use crate::duplicate::check_and_link;
use crate::error::LaunchPadError;
use chrono::Utc;
use launchpad_core::{DupeFinderRegistry, Firework, FwState, Query, ReservationId};
use launchpad_storage::{dispatch_sort, FwUpdateOp, Store};

/// A guard against runaway duplicate-theft loop-backs (step 5 of the
/// selection procedure can, in principle, keep re-finding stolen
/// candidates forever if the dupefinder population is pathological).
const MAX_DUPLICATE_LOOPS: usize = 16;

pub struct Dispatcher<'a> {
    store: &'a dyn Store,
    dupefinders: &'a DupeFinderRegistry,
    fifo: bool,
}

impl<'a> Dispatcher<'a> {
    pub fn new(store: &'a dyn Store, dupefinders: &'a DupeFinderRegistry, fifo: bool) -> Self {
        Self { store, dupefinders, fifo }
    }

    /// Claim the next ready firework matching `query`, honoring
    /// `fw_id`/`checkout` overrides, looping when a candidate is absorbed
    /// into another firework's duplicate set mid-selection.
    pub fn reserve_ready(
        &self,
        query: &Query,
        fw_id: Option<i64>,
        checkout: bool,
        reservation_id: ReservationId,
    ) -> Result<Option<Firework>, LaunchPadError> {
        let sort = dispatch_sort(self.fifo);

        for _ in 0..MAX_DUPLICATE_LOOPS {
            let filter = match fw_id {
                Some(id) => Query::new()
                    .eq("fw_id", id)
                    .in_set("state", vec![serde_json::json!("READY"), serde_json::json!("RESERVED")]),
                None => Query::new().eq("state", "READY").and(query.clone()),
            };

            let mut chosen = if checkout {
                let now = Utc::now();
                let Some(fw) = self.store.find_one_and_update_firework(
                    &filter,
                    Some(&sort),
                    FwUpdateOp::SetState { state: FwState::Reserved, updated_on: now },
                )?
                else {
                    return Ok(None);
                };
                fw
            } else {
                let Some(fw) = self.store.find_fireworks(&filter, Some(&sort), Some(1))?.into_iter().next()
                else {
                    return Ok(None);
                };
                fw
            };

            if !checkout {
                return Ok(Some(chosen));
            }

            let dupe = check_and_link(self.store, self.dupefinders, &mut chosen)?;
            if dupe.stolen {
                // This candidate is absorbed into an already-claimed
                // partner's duplicate set rather than dispatched on its
                // own. Defuse it instead of returning it to READY: putting
                // it back to READY would just make the next loop iteration
                // re-select and re-steal it forever.
                chosen.transition(FwState::Defused, Utc::now())?;
                self.store.find_one_and_replace_firework(chosen)?;
                continue;
            }

            // The atomic find-and-update above already performed the
            // READY -> RESERVED linearization; stamp the reservation id
            // onto that history entry rather than transitioning again.
            if let Some(entry) = chosen.state_history.last_mut() {
                entry.reservation_id = Some(reservation_id.clone());
            }
            self.store.find_one_and_replace_firework(chosen.clone())?;
            return Ok(Some(chosen));
        }

        Err(LaunchPadError::InternalRefresh {
            fw_id: fw_id.unwrap_or(-1),
            message: "duplicate-theft loop exceeded retry budget".to_string(),
        })
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
