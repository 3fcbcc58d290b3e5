// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A deferred-materialization handle over a single firework, so
//! workflow-wide reads (walking every node just to report names/states)
//! don't pay for loading every launch's full `action` payload.

use crate::error::LaunchPadError;
use launchpad_core::{ActionSlot, FWAction, Firework};
use launchpad_storage::Store;
use std::cell::RefCell;

/// Holds only `fw_id` until a field is actually asked for, then caches the
/// full document for subsequent accesses.
pub struct LazyFirework<'a> {
    store: &'a dyn Store,
    fw_id: i64,
    cached: RefCell<Option<Firework>>,
}

impl<'a> LazyFirework<'a> {
    pub fn new(store: &'a dyn Store, fw_id: i64) -> Self {
        Self { store, fw_id, cached: RefCell::new(None) }
    }

    pub fn fw_id(&self) -> i64 {
        self.fw_id
    }

    fn materialize(&self) -> Result<(), LaunchPadError> {
        if self.cached.borrow().is_some() {
            return Ok(());
        }
        let fw = self.store.get_firework(self.fw_id)?.ok_or(LaunchPadError::NotFound { fw_id: self.fw_id })?;
        *self.cached.borrow_mut() = Some(fw);
        Ok(())
    }

    pub fn name(&self) -> Result<String, LaunchPadError> {
        self.materialize()?;
        // materialize() just populated cached or returned early because it already was
        #[allow(clippy::expect_used)]
        let name = self.cached.borrow().as_ref().expect("materialized above").name.clone();
        Ok(name)
    }

    pub fn state(&self) -> Result<launchpad_core::FwState, LaunchPadError> {
        self.materialize()?;
        // materialize() just populated cached or returned early because it already was
        #[allow(clippy::expect_used)]
        let state = self.cached.borrow().as_ref().expect("materialized above").state;
        Ok(state)
    }

    pub fn spec(&self) -> Result<serde_json::Map<String, serde_json::Value>, LaunchPadError> {
        self.materialize()?;
        // materialize() just populated cached or returned early because it already was
        #[allow(clippy::expect_used)]
        let spec = self.cached.borrow().as_ref().expect("materialized above").spec.clone();
        Ok(spec)
    }

    /// Resolve the action payload, following a blob spillover if present.
    pub fn action(&self) -> Result<FWAction, LaunchPadError> {
        self.materialize()?;
        let fw = self.cached.borrow();
        // materialize() just populated cached or returned early because it already was
        #[allow(clippy::expect_used)]
        let fw = fw.as_ref().expect("materialized above");
        match &fw.action {
            ActionSlot::Inline(action) => Ok(action.clone()),
            ActionSlot::Spillover { spillover_id } => {
                let blob = self.store.blob_store().ok_or_else(|| LaunchPadError::InternalRefresh {
                    fw_id: self.fw_id,
                    message: "action spilled but no blob store is configured".to_string(),
                })?;
                let bytes = blob.get(spillover_id).map_err(|e| LaunchPadError::InternalRefresh {
                    fw_id: self.fw_id,
                    message: format!("failed to fetch spilled action: {e}"),
                })?;
                serde_json::from_slice(&bytes).map_err(|e| LaunchPadError::InternalRefresh {
                    fw_id: self.fw_id,
                    message: format!("failed to decode spilled action: {e}"),
                })
            }
        }
    }
}

#[cfg(test)]
#[path = "lazy_tests.rs"]
mod tests;
