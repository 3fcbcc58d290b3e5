// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The durable event type written to the WAL and folded into [`crate::StoreState`].
//!
//! Every mutation the [`Store`](crate::Store) trait exposes is first
//! turned into a `StoreOp`, appended to the log, and only then applied to the
//! in-memory index — the same write-ahead pattern the WAL module documents.

use launchpad_core::{Firework, Workflow};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StoreOp {
    /// `insert_one`/`insert_many` on the `fireworks` collection.
    InsertFirework(Box<Firework>),
    /// `find_one_and_replace` on `(fw_id, launch_idx)`, `upsert=true`.
    ReplaceFirework(Box<Firework>),
    /// `delete_many` on the `fireworks` collection by `fw_id`.
    DeleteFireworks(Vec<i64>),
    /// `insert_one` on the `workflows` collection.
    InsertWorkflow(Box<Workflow>),
    /// `find_one_and_replace`/`find_one_and_update` on the `workflows`
    /// collection, keyed by its minimal node id.
    ReplaceWorkflow(Box<Workflow>),
    /// `delete_many` on the `workflows` collection, keyed by minimal node id.
    DeleteWorkflows(Vec<i64>),
    /// `$inc` on the `fw_id_assigner` counter document.
    IncrCounter { amount: i64 },
    /// Replaces the counter document outright (`reset`).
    ResetCounter { value: i64 },
    /// Control marker; carries no state mutation. Mirrors the WAL's need to
    /// durably record a graceful-shutdown boundary even though replay must
    /// skip it.
    Shutdown,
}

#[cfg(test)]
#[path = "ops_tests.rs"]
mod tests;
