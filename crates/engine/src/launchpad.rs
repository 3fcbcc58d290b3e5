// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `LaunchPad`: the facade tying the dispatcher, checkin pipeline,
//! janitor, duplicate engine, and recovery together behind the operator
//! surface a worker or admin tool actually calls.

use crate::checkin::checkin;
use crate::dispatcher::Dispatcher;
use crate::error::LaunchPadError;
use crate::id_assigner::IdAssigner;
use crate::janitor::Janitor;
use crate::recovery::{self, RecoveryMode};
use chrono::Utc;
use launchpad_core::{DupeFinderRegistry, FWAction, Firework, FwState, Query, ReservationId, Sort, Workflow};
use launchpad_storage::{Store, StoreError, TuneupResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

pub use crate::config::LaunchPadConfig;

/// Snapshot of a workflow's `fw_states` at a chosen projection depth.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowProjection {
    /// Just `name`/`state` for every node.
    Less(Vec<(i64, FwState)>),
    /// `Less` plus each node's `spec`.
    More(Vec<(i64, FwState, serde_json::Map<String, serde_json::Value>)>),
    /// `Less` plus the reservation id of any RESERVED node.
    Reservations(Vec<(i64, FwState, Option<ReservationId>)>),
    /// The full `Workflow` and every node's `Firework`.
    All(Workflow, Vec<Firework>),
}

/// The projection depth requested from [`LaunchPad::get_wf_data`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WfDataMode {
    Less,
    More,
    Reservations,
    All,
}

/// Result of [`LaunchPad::get_fw_ids`]/[`LaunchPad::get_wf_ids`]: the
/// matching ids, or just how many matched when `count_only` was requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdQueryResult {
    Ids(Vec<i64>),
    Count(usize),
}

pub struct LaunchPad<S: Store> {
    store: S,
    config: LaunchPadConfig,
    dupefinders: DupeFinderRegistry,
    backups: Mutex<HashMap<i64, Firework>>,
}

impl<S: Store> LaunchPad<S> {
    pub fn new(store: S, config: LaunchPadConfig, dupefinders: DupeFinderRegistry) -> Self {
        Self { store, config, dupefinders, backups: Mutex::new(HashMap::new()) }
    }

    pub fn config(&self) -> &LaunchPadConfig {
        &self.config
    }

    fn wflock_expire(&self) -> Duration {
        Duration::from_secs(self.config.wflock_expiration_secs)
    }

    // -- bootstrap -----------------------------------------------------

    /// Wipe and reinitialize the store's counter (`reset(v)`), matching the
    /// operator `reset` surface used for fresh deployments and tests.
    pub fn reset(&self, starting_id: i64) -> Result<(), LaunchPadError> {
        IdAssigner::new(&self.store).reset(starting_id)
    }

    /// Insert a new workflow, assigning fresh ids to every node that still
    /// carries a placeholder `fw_id`.
    pub fn add_wf(&self, mut workflow: Workflow, mut fireworks: Vec<Firework>) -> Result<Workflow, LaunchPadError> {
        let assigner = IdAssigner::new(&self.store);
        let n = fireworks.iter().filter(|fw| fw.fw_id.is_placeholder()).count() as i64;
        let first_id = if n > 0 { assigner.next_id(n)? } else { 0 };

        let mut next_id = first_id;
        let mut remap = HashMap::new();
        for fw in &mut fireworks {
            if fw.fw_id.is_placeholder() {
                let old = fw.fw_id.get();
                fw.fw_id = launchpad_core::FireworkId::new(next_id);
                remap.insert(old, next_id);
                next_id += 1;
            }
        }

        if !remap.is_empty() {
            workflow.nodes = workflow.nodes.iter().map(|n| *remap.get(n).unwrap_or(n)).collect();
            workflow.links = workflow
                .links
                .into_iter()
                .map(|(parent, children)| {
                    let parent = *remap.get(&parent).unwrap_or(&parent);
                    let children = children.iter().map(|c| *remap.get(c).unwrap_or(c)).collect();
                    (parent, children)
                })
                .collect();
            workflow.fw_states = workflow
                .fw_states
                .into_iter()
                .map(|(k, v)| (*remap.get(&k).unwrap_or(&k), v))
                .collect();
        }

        self.store.insert_many_fireworks(fireworks)?;
        self.store.insert_one_workflow(workflow.clone())?;
        Ok(workflow)
    }

    pub fn get_fw(&self, fw_id: i64) -> Result<Firework, LaunchPadError> {
        self.store.get_firework(fw_id)?.ok_or(LaunchPadError::NotFound { fw_id })
    }

    pub fn get_wf(&self, fw_id: i64) -> Result<Workflow, LaunchPadError> {
        self.store.get_workflow(fw_id)?.ok_or(LaunchPadError::NotFound { fw_id })
    }

    /// Delete the workflow containing `fw_id` and every one of its nodes.
    /// When `delete_dirs` is set, also best-effort-removes each node's
    /// `launch_dir` from the filesystem; a removal failure is logged and
    /// does not abort the deletion.
    pub fn delete_wf(&self, fw_id: i64, delete_dirs: bool) -> Result<usize, LaunchPadError> {
        let workflow = self.get_wf(fw_id)?;
        let node_ids: Vec<i64> = workflow.nodes.iter().copied().collect();

        if delete_dirs {
            for node_id in &node_ids {
                let Some(dir) = self.get_fw(*node_id)?.launch_dir else { continue };
                if let Err(err) = std::fs::remove_dir_all(&dir) {
                    tracing::warn!(fw_id = *node_id, %dir, %err, "failed to remove launch directory");
                }
            }
        }

        self.store.delete_many_fireworks(&node_ids)?;
        Ok(self.store.delete_many_workflows(&[fw_id])?)
    }

    // -- dispatch/checkin ------------------------------------------------

    pub fn reserve(
        &self,
        query: &Query,
        fw_id: Option<i64>,
        checkout: bool,
        reservation_id: ReservationId,
    ) -> Result<Option<Firework>, LaunchPadError> {
        Dispatcher::new(&self.store, &self.dupefinders, self.config.sort_fws).reserve_ready(
            query,
            fw_id,
            checkout,
            reservation_id,
        )
    }

    pub fn checkin(&self, firework: Firework, action: FWAction, state: FwState) -> Result<Firework, LaunchPadError> {
        checkin(&self.store, firework, action, state, self.wflock_expire(), self.config.wflock_expiration_kill)
    }

    pub fn cancel_reservation(&self, fw_id: i64) -> Result<(), LaunchPadError> {
        let mut fw = self.get_fw(fw_id)?;
        fw.transition(FwState::Ready, Utc::now())?;
        self.store.find_one_and_replace_firework(fw)?;
        crate::workflow_refresh::refresh_workflow(
            &self.store,
            fw_id,
            FwState::Ready,
            self.wflock_expire(),
            self.config.wflock_expiration_kill,
        )
    }

    pub fn rerun(&self, fw_id: i64) -> Result<Firework, LaunchPadError> {
        let mut fw = self.get_fw(fw_id)?;
        fw.rerun(Utc::now())?;
        self.store.find_one_and_replace_firework(fw.clone())?;
        crate::workflow_refresh::refresh_workflow(
            &self.store,
            fw_id,
            FwState::Ready,
            self.wflock_expire(),
            self.config.wflock_expiration_kill,
        )?;
        Ok(fw)
    }

    // -- maintenance -----------------------------------------------------

    pub fn detect_unreserved(&self, expiry: Duration, rerun: bool) -> Result<Vec<i64>, LaunchPadError> {
        Janitor::new(&self.store).detect_unreserved(
            expiry,
            rerun,
            self.wflock_expire(),
            self.config.wflock_expiration_kill,
        )
    }

    pub fn detect_lost_runs(&self, expiry: Duration) -> Result<Vec<i64>, LaunchPadError> {
        Janitor::new(&self.store).detect_lost_runs(expiry, self.wflock_expire(), self.config.wflock_expiration_kill)
    }

    pub fn tuneup(&self, background: bool) -> TuneupResult {
        Janitor::new(&self.store).tuneup(background)
    }

    // -- recovery --------------------------------------------------------

    pub fn recover(&self, fw_id: i64, mode: RecoveryMode) -> Result<bool, LaunchPadError> {
        recovery::recover(&self.store, fw_id, mode)
    }

    pub fn clear_recovery(&self, fw_id: i64) -> Result<(), LaunchPadError> {
        recovery::clear_recovery(&self.store, fw_id)
    }

    // -- bulk id/query helpers -------------------------------------------

    /// `get_fw_ids`/`get_wf_ids`: ids of fireworks matching `query`, or just
    /// the match count when `count_only` is set (avoiding materializing
    /// every id). `count_only` combined with a non-zero `limit` is a caller
    /// error, raised rather than silently mismeasured.
    pub fn get_fw_ids(
        &self,
        query: &Query,
        sort: Option<&Sort>,
        limit: Option<usize>,
        count_only: bool,
    ) -> Result<IdQueryResult, LaunchPadError> {
        if count_only && limit.is_some() {
            return Err(LaunchPadError::Store(StoreError::InvalidQuery(
                "count_only cannot be combined with a non-zero limit".to_string(),
            )));
        }
        if count_only {
            let count = self.store.find_fireworks(query, sort, None)?.len();
            return Ok(IdQueryResult::Count(count));
        }
        let fws = self.store.find_fireworks(query, sort, limit)?;
        Ok(IdQueryResult::Ids(fws.into_iter().map(|fw| fw.fw_id.get()).collect()))
    }

    pub fn get_wf_ids(
        &self,
        query: &Query,
        count_only: bool,
        limit: Option<usize>,
    ) -> Result<IdQueryResult, LaunchPadError> {
        if count_only && limit.is_some() {
            return Err(LaunchPadError::Store(StoreError::InvalidQuery(
                "count_only cannot be combined with a non-zero limit".to_string(),
            )));
        }
        let mut wfs = self.store.find_workflows(query)?;
        if count_only {
            return Ok(IdQueryResult::Count(wfs.len()));
        }
        if let Some(limit) = limit {
            wfs.truncate(limit);
        }
        Ok(IdQueryResult::Ids(wfs.into_iter().flat_map(|wf| wf.nodes).collect()))
    }

    /// Restricted bulk spec patch: only fireworks currently in
    /// `{READY, WAITING, FIZZLED, DEFUSED, PAUSED}` are touched; others are
    /// skipped with a warning rather than aborting the whole batch.
    pub fn update_spec(
        &self,
        fw_ids: &[i64],
        patch: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Vec<i64>, LaunchPadError> {
        const ELIGIBLE: [FwState; 5] =
            [FwState::Ready, FwState::Waiting, FwState::Fizzled, FwState::Defused, FwState::Paused];
        let mut updated = Vec::new();
        for &fw_id in fw_ids {
            let Some(mut fw) = self.store.get_firework(fw_id)? else {
                tracing::warn!(fw_id, "update_spec: no such firework, skipping");
                continue;
            };
            if !ELIGIBLE.contains(&fw.state) {
                tracing::warn!(fw_id, state = %fw.state, "update_spec: firework not in an eligible state, skipping");
                continue;
            }
            for (k, v) in patch {
                fw.spec.insert(k.clone(), v.clone());
            }
            fw.updated_on = Utc::now();
            self.store.find_one_and_replace_firework(fw)?;
            updated.push(fw_id);
        }
        Ok(updated)
    }

    pub fn set_priority(&self, fw_id: i64, priority: i64) -> Result<(), LaunchPadError> {
        let mut fw = self.get_fw(fw_id)?;
        fw.set_priority(priority);
        fw.updated_on = Utc::now();
        self.store.find_one_and_replace_firework(fw)?;
        Ok(())
    }

    // -- reservation-id indirection ---------------------------------------

    pub fn get_reservation_id_from_fw_id(&self, fw_id: i64) -> Result<Option<ReservationId>, LaunchPadError> {
        let fw = self.get_fw(fw_id)?;
        Ok(fw
            .last_entry_for(FwState::Reserved)
            .and_then(|entry| entry.reservation_id.clone()))
    }

    pub fn get_fw_ids_from_reservation_id(&self, reservation_id: &ReservationId) -> Result<Vec<i64>, LaunchPadError> {
        let fws = self.store.find_fireworks(&Query::new().eq("state", "RESERVED"), None, None)?;
        Ok(fws
            .into_iter()
            .filter(|fw| {
                fw.last_entry_for(FwState::Reserved)
                    .and_then(|e| e.reservation_id.as_ref())
                    == Some(reservation_id)
            })
            .map(|fw| fw.fw_id.get())
            .collect())
    }

    pub fn cancel_reservation_by_reservation_id(&self, reservation_id: &ReservationId) -> Result<Vec<i64>, LaunchPadError> {
        let fw_ids = self.get_fw_ids_from_reservation_id(reservation_id)?;
        for fw_id in &fw_ids {
            self.cancel_reservation(*fw_id)?;
        }
        Ok(fw_ids)
    }

    /// Stamp a caller-issued reservation id directly, for external queue
    /// adapters that assign their own identifiers instead of going through
    /// [`LaunchPad::reserve`].
    pub fn set_reservation_id(&self, fw_id: i64, reservation_id: ReservationId) -> Result<(), LaunchPadError> {
        let mut fw = self.get_fw(fw_id)?;
        if let Some(entry) = fw.state_history.last_mut() {
            entry.reservation_id = Some(reservation_id);
        }
        fw.updated_on = Utc::now();
        self.store.find_one_and_replace_firework(fw)?;
        Ok(())
    }

    // -- launch directory --------------------------------------------------

    pub fn change_launch_dir(&self, fw_id: i64, dir: impl Into<String>) -> Result<(), LaunchPadError> {
        let mut fw = self.get_fw(fw_id)?;
        fw.launch_dir = Some(dir.into());
        fw.updated_on = Utc::now();
        self.store.find_one_and_replace_firework(fw)?;
        Ok(())
    }

    pub fn get_launchdir(&self, fw_id: i64) -> Result<Option<String>, LaunchPadError> {
        Ok(self.get_fw(fw_id)?.launch_dir)
    }

    /// The monitoring records a worker has appended to `fw_id`'s `trackers`.
    pub fn get_tracker_data(&self, fw_id: i64) -> Result<Vec<serde_json::Value>, LaunchPadError> {
        Ok(self.get_fw(fw_id)?.trackers)
    }

    // -- backup/restore ----------------------------------------------------

    /// Snapshot `fw_id`'s current document into the in-process backup slot,
    /// overwriting any prior backup for that id. Not persisted; survives
    /// only for the lifetime of this `LaunchPad` instance.
    pub fn backup_fw_data(&self, fw_id: i64) -> Result<(), LaunchPadError> {
        let fw = self.get_fw(fw_id)?;
        self.backups.lock().insert(fw_id, fw);
        Ok(())
    }

    /// Restore `fw_id` from its in-process backup slot, if one exists.
    pub fn restore_backup_data(&self, fw_id: i64) -> Result<bool, LaunchPadError> {
        let Some(fw) = self.backups.lock().get(&fw_id).cloned() else {
            return Ok(false);
        };
        self.store.find_one_and_replace_firework(fw)?;
        Ok(true)
    }

    // -- workflow projection -----------------------------------------------

    /// Fetch a workflow summary at the requested projection depth, rather
    /// than always paying for the full `Workflow` plus every node's
    /// `Firework`.
    pub fn get_wf_data(&self, fw_id: i64, mode: WfDataMode) -> Result<WorkflowProjection, LaunchPadError> {
        let workflow = self.get_wf(fw_id)?;
        let states: Vec<(i64, FwState)> = workflow.fw_states.iter().map(|(id, s)| (*id, *s)).collect();

        match mode {
            WfDataMode::Less => Ok(WorkflowProjection::Less(states)),
            WfDataMode::More => {
                let mut out = Vec::with_capacity(states.len());
                for (id, state) in states {
                    let fw = self.get_fw(id)?;
                    out.push((id, state, fw.spec));
                }
                Ok(WorkflowProjection::More(out))
            }
            WfDataMode::Reservations => {
                let mut out = Vec::with_capacity(states.len());
                for (id, state) in states {
                    let reservation_id = self.get_reservation_id_from_fw_id(id)?;
                    out.push((id, state, reservation_id));
                }
                Ok(WorkflowProjection::Reservations(out))
            }
            WfDataMode::All => {
                let mut fws = Vec::with_capacity(workflow.nodes.len());
                for id in &workflow.nodes {
                    fws.push(self.get_fw(*id)?);
                }
                Ok(WorkflowProjection::All(workflow, fws))
            }
        }
    }

    /// Raw store handle access for callers that need operations not yet
    /// wrapped by the facade (e.g. direct index maintenance).
    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
#[path = "launchpad_tests.rs"]
mod tests;
