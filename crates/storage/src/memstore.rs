// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The in-process [`Store`] implementation: a [`StoreState`] index guarded
//! by a single mutex (which doubles as the atomicity boundary the
//! find-and-modify operations require), optionally backed by a [`Wal`] for
//! crash recovery and a [`BlobStore`] for action spillover.

use crate::blob::BlobStore;
use crate::error::StoreError;
use crate::indexes::{IndexRegistry, TuneupResult};
use crate::ops::StoreOp;
use crate::state::StoreState;
use crate::store::{FwUpdateOp, Store};
use crate::wal::Wal;
use chrono::Utc;
use launchpad_core::{Firework, LaunchIdx, Query, Sort, Workflow};
use parking_lot::Mutex;
use std::path::Path;

/// Mirrors MongoDB's 16MB BSON document limit, since the store contract is
/// Mongo-flavored (see `mongo_socket_timeout_ms` in the engine config).
const DEFAULT_DOCUMENT_SIZE_LIMIT_BYTES: usize = 16_000_000;

struct Inner {
    state: StoreState,
    wal: Option<Wal>,
}

impl Inner {
    fn durable_apply(&mut self, op: StoreOp) -> Result<(), StoreError> {
        if let Some(wal) = &mut self.wal {
            wal.append(&op)?;
            if wal.needs_flush() {
                wal.flush()?;
            }
        }
        self.state.apply(&op);
        Ok(())
    }
}

pub struct InMemoryStore {
    inner: Mutex<Inner>,
    indexes: IndexRegistry,
    blob: Option<Box<dyn BlobStore>>,
    document_size_limit_bytes: usize,
}

impl InMemoryStore {
    /// A pure in-memory store with no durability and no blob side-channel.
    /// Suitable for tests and ephemeral embedders.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: StoreState::new(),
                wal: None,
            }),
            indexes: IndexRegistry::new(),
            blob: None,
            document_size_limit_bytes: DEFAULT_DOCUMENT_SIZE_LIMIT_BYTES,
        }
    }

    pub fn with_blob_store(mut self, blob: Box<dyn BlobStore>) -> Self {
        self.blob = Some(blob);
        self
    }

    /// Override the per-document size limit enforced on `find_one_and_replace`.
    /// Exposed mainly so tests can exercise the spillover path without a
    /// 16MB payload.
    pub fn with_document_size_limit(mut self, bytes: usize) -> Self {
        self.document_size_limit_bytes = bytes;
        self
    }

    /// Open (or create) a WAL-backed store at `wal_path`, replaying any
    /// entries written since the last snapshot.
    pub fn open(wal_path: &Path, snapshot: Option<StoreState>) -> Result<Self, StoreError> {
        let state = snapshot.unwrap_or_default();
        let wal = Wal::open(wal_path, 0)?;
        let mut store_state = state;
        let mut wal = wal;
        while let Some(entry) = wal.next_unprocessed()? {
            store_state.apply(&entry.event);
            wal.mark_processed(entry.seq);
        }
        Ok(Self {
            inner: Mutex::new(Inner {
                state: store_state,
                wal: Some(wal),
            }),
            indexes: IndexRegistry::new(),
            blob: None,
            document_size_limit_bytes: DEFAULT_DOCUMENT_SIZE_LIMIT_BYTES,
        })
    }

    fn to_json(fw: &Firework) -> Result<serde_json::Value, StoreError> {
        serde_json::to_value(fw).map_err(StoreError::from)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for InMemoryStore {
    fn find_one_and_update_firework(
        &self,
        query: &Query,
        sort: Option<&Sort>,
        op: FwUpdateOp,
    ) -> Result<Option<Firework>, StoreError> {
        let mut inner = self.inner.lock();

        let mut candidates: Vec<Firework> = Vec::new();
        for fw_id in inner.state.latest_launch.keys().copied().collect::<Vec<_>>() {
            if let Some(fw) = inner.state.latest_firework(fw_id) {
                let doc = Self::to_json(fw)?;
                if query.matches(&doc) {
                    candidates.push(fw.clone());
                }
            }
        }

        if let Some(sort) = sort {
            candidates.sort_by(|a, b| {
                let da = serde_json::to_value(a).unwrap_or(serde_json::Value::Null);
                let db = serde_json::to_value(b).unwrap_or(serde_json::Value::Null);
                sort.compare(&da, &db)
            });
        }

        let Some(mut chosen) = candidates.into_iter().next() else {
            return Ok(None);
        };

        match op {
            FwUpdateOp::SetState { state, updated_on } => {
                chosen
                    .transition(state, updated_on)
                    .map_err(|e| StoreError::InvalidQuery(e.to_string()))?;
            }
        }

        inner.durable_apply(StoreOp::ReplaceFirework(Box::new(chosen.clone())))?;
        Ok(Some(chosen))
    }

    fn find_one_and_replace_firework(&self, firework: Firework) -> Result<(), StoreError> {
        let encoded = serde_json::to_vec(&firework)?;
        if encoded.len() > self.document_size_limit_bytes {
            return Err(StoreError::DocumentTooLarge { size_bytes: encoded.len() });
        }
        let mut inner = self.inner.lock();
        inner.durable_apply(StoreOp::ReplaceFirework(Box::new(firework)))
    }

    fn find_fireworks(
        &self,
        query: &Query,
        sort: Option<&Sort>,
        limit: Option<usize>,
    ) -> Result<Vec<Firework>, StoreError> {
        let inner = self.inner.lock();
        let mut results: Vec<Firework> = Vec::new();
        for fw_id in inner.state.latest_launch.keys() {
            if let Some(fw) = inner.state.latest_firework(*fw_id) {
                let doc = Self::to_json(fw)?;
                if query.matches(&doc) {
                    results.push(fw.clone());
                }
            }
        }
        if let Some(sort) = sort {
            results.sort_by(|a, b| {
                let da = serde_json::to_value(a).unwrap_or(serde_json::Value::Null);
                let db = serde_json::to_value(b).unwrap_or(serde_json::Value::Null);
                sort.compare(&da, &db)
            });
        }
        if let Some(limit) = limit {
            results.truncate(limit);
        }
        Ok(results)
    }

    fn get_firework(&self, fw_id: i64) -> Result<Option<Firework>, StoreError> {
        Ok(self.inner.lock().state.latest_firework(fw_id).cloned())
    }

    fn get_firework_launch(
        &self,
        fw_id: i64,
        launch_idx: LaunchIdx,
    ) -> Result<Option<Firework>, StoreError> {
        Ok(self.inner.lock().state.firework_at(fw_id, launch_idx).cloned())
    }

    fn insert_one_firework(&self, firework: Firework) -> Result<(), StoreError> {
        let key = (firework.fw_id.get(), firework.launch_idx.get());
        let mut inner = self.inner.lock();
        if inner.state.fireworks.contains_key(&key) {
            return Err(StoreError::DuplicateKey {
                fw_id: key.0,
                launch_idx: key.1,
            });
        }
        inner.durable_apply(StoreOp::InsertFirework(Box::new(firework)))
    }

    fn insert_many_fireworks(&self, fireworks: Vec<Firework>) -> Result<(), StoreError> {
        for fw in fireworks {
            self.insert_one_firework(fw)?;
        }
        Ok(())
    }

    fn delete_many_fireworks(&self, fw_ids: &[i64]) -> Result<usize, StoreError> {
        let mut inner = self.inner.lock();
        let count = fw_ids
            .iter()
            .filter(|id| inner.state.latest_launch.contains_key(id))
            .count();
        inner.durable_apply(StoreOp::DeleteFireworks(fw_ids.to_vec()))?;
        Ok(count)
    }

    fn get_workflow(&self, fw_id: i64) -> Result<Option<Workflow>, StoreError> {
        Ok(self.inner.lock().state.workflow_containing(fw_id).cloned())
    }

    fn find_workflows(&self, query: &Query) -> Result<Vec<Workflow>, StoreError> {
        let inner = self.inner.lock();
        let mut results = Vec::new();
        for wf in inner.state.workflows.values() {
            let doc = serde_json::to_value(wf)?;
            if query.matches(&doc) {
                results.push(wf.clone());
            }
        }
        Ok(results)
    }

    fn insert_one_workflow(&self, workflow: Workflow) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.durable_apply(StoreOp::InsertWorkflow(Box::new(workflow)))
    }

    fn find_one_and_replace_workflow(&self, workflow: Workflow) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.durable_apply(StoreOp::ReplaceWorkflow(Box::new(workflow)))
    }

    fn delete_many_workflows(&self, keys: &[i64]) -> Result<usize, StoreError> {
        let mut inner = self.inner.lock();
        let count = keys
            .iter()
            .filter(|k| inner.state.workflows.contains_key(k))
            .count();
        inner.durable_apply(StoreOp::DeleteWorkflows(keys.to_vec()))?;
        Ok(count)
    }

    fn try_lock_workflow(&self, fw_id: i64) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        let Some(wf) = inner.state.workflow_containing(fw_id).cloned() else {
            return Err(StoreError::NotFound(format!("workflow containing fw_id={fw_id}")));
        };
        if wf.is_locked() {
            return Ok(false);
        }
        let mut locked_wf = wf;
        locked_wf.locked = Some(true);
        locked_wf.updated_on = Utc::now();
        inner.durable_apply(StoreOp::ReplaceWorkflow(Box::new(locked_wf)))?;
        Ok(true)
    }

    fn force_lock_workflow(&self, fw_id: i64) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let Some(mut wf) = inner.state.workflow_containing(fw_id).cloned() else {
            return Err(StoreError::NotFound(format!("workflow containing fw_id={fw_id}")));
        };
        wf.locked = Some(true);
        wf.updated_on = Utc::now();
        inner.durable_apply(StoreOp::ReplaceWorkflow(Box::new(wf)))
    }

    fn unlock_workflow(&self, fw_id: i64) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let Some(mut wf) = inner.state.workflow_containing(fw_id).cloned() else {
            return Err(StoreError::NotFound(format!("workflow containing fw_id={fw_id}")));
        };
        wf.locked = None;
        wf.updated_on = Utc::now();
        inner.durable_apply(StoreOp::ReplaceWorkflow(Box::new(wf)))
    }

    fn next_id(&self, n: i64) -> Result<i64, StoreError> {
        let mut inner = self.inner.lock();
        let prev = inner.state.next_fw_id;
        inner.durable_apply(StoreOp::IncrCounter { amount: n })?;
        Ok(prev)
    }

    fn reset_counter(&self, v: i64) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.durable_apply(StoreOp::ResetCounter { value: v })
    }

    fn tuneup(&self, background: bool) -> TuneupResult {
        self.indexes.tuneup(background)
    }

    fn blob_store(&self) -> Option<&dyn BlobStore> {
        self.blob.as_deref()
    }
}

#[cfg(test)]
#[path = "memstore_tests.rs"]
mod tests;
