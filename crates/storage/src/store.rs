// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The store adapter contract: atomic CRUD plus find-and-modify over
//! `fireworks`/`workflows`, the `fw_id_assigner` counter, and a blob
//! side-channel. Modeled as a trait so the engine depends on the contract,
//! not a concrete backend — the persistent store is an external
//! collaborator specified only through the contract it must satisfy.
//!
//! The update half of `find_one_and_update` is a closed set of operations
//! ([`FwUpdateOp`]) rather than a general update-operator language:
//! LaunchPad only ever needs to flip a firework's state atomically, never
//! an arbitrary document patch.

use crate::blob::BlobStore;
use crate::error::StoreError;
use crate::indexes::TuneupResult;
use chrono::{DateTime, Utc};
use launchpad_core::{Firework, FwState, Query, Sort, Workflow};

/// The closed set of atomic update operations the dispatcher and janitor
/// need against a single firework document.
#[derive(Debug, Clone)]
pub enum FwUpdateOp {
    SetState {
        state: FwState,
        updated_on: DateTime<Utc>,
    },
}

pub trait Store: Send + Sync {
    // -- fireworks ---------------------------------------------------

    /// `find_one_and_update`: locate the single highest-sorted document
    /// matching `query`, apply `op`, and return the post-update document.
    /// Used by the dispatcher's checkout and the janitor's reservation/run
    /// recovery — the linearization point guaranteeing exactly one caller
    /// observes `state=READY -> RESERVED` for a given document.
    fn find_one_and_update_firework(
        &self,
        query: &Query,
        sort: Option<&Sort>,
        op: FwUpdateOp,
    ) -> Result<Option<Firework>, StoreError>;

    /// `find_one_and_replace`, keyed by `(fw_id, launch_idx)`, with
    /// `upsert=true` semantics.
    fn find_one_and_replace_firework(&self, firework: Firework) -> Result<(), StoreError>;

    /// `find`: all documents matching `query`, sorted and limited as given.
    fn find_fireworks(
        &self,
        query: &Query,
        sort: Option<&Sort>,
        limit: Option<usize>,
    ) -> Result<Vec<Firework>, StoreError>;

    /// The authoritative (highest-`launch_idx`) document for `fw_id`.
    fn get_firework(&self, fw_id: i64) -> Result<Option<Firework>, StoreError>;

    /// A specific launch, or the latest if `launch_idx` is
    /// [`LaunchIdx::LATEST`](launchpad_core::LaunchIdx::LATEST).
    fn get_firework_launch(
        &self,
        fw_id: i64,
        launch_idx: launchpad_core::LaunchIdx,
    ) -> Result<Option<Firework>, StoreError>;

    fn insert_one_firework(&self, firework: Firework) -> Result<(), StoreError>;
    fn insert_many_fireworks(&self, fireworks: Vec<Firework>) -> Result<(), StoreError>;
    fn delete_many_fireworks(&self, fw_ids: &[i64]) -> Result<usize, StoreError>;

    // -- workflows -----------------------------------------------------

    fn get_workflow(&self, fw_id: i64) -> Result<Option<Workflow>, StoreError>;
    fn find_workflows(&self, query: &Query) -> Result<Vec<Workflow>, StoreError>;
    fn insert_one_workflow(&self, workflow: Workflow) -> Result<(), StoreError>;
    fn find_one_and_replace_workflow(&self, workflow: Workflow) -> Result<(), StoreError>;
    fn delete_many_workflows(&self, keys: &[i64]) -> Result<usize, StoreError>;

    /// Compare-and-set lock acquisition: atomically find the workflow
    /// containing `fw_id` with `locked` unset, and set it. Returns `true`
    /// on success.
    fn try_lock_workflow(&self, fw_id: i64) -> Result<bool, StoreError>;

    /// Forcibly take the lock regardless of current state (the `kill` path).
    fn force_lock_workflow(&self, fw_id: i64) -> Result<(), StoreError>;

    fn unlock_workflow(&self, fw_id: i64) -> Result<(), StoreError>;

    // -- id assigner -----------------------------------------------------

    /// `next_id(n)`: atomically reserve `[prev, prev+n)` and return `prev`.
    fn next_id(&self, n: i64) -> Result<i64, StoreError>;

    /// `reset(v)`: replace the counter document outright.
    fn reset_counter(&self, v: i64) -> Result<(), StoreError>;

    // -- indexes -----------------------------------------------------

    fn tuneup(&self, background: bool) -> TuneupResult;

    // -- blob side-channel -----------------------------------------------------

    fn blob_store(&self) -> Option<&dyn BlobStore>;
}
