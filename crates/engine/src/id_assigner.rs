// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A thin facade over the store's id counter, handing out contiguous
//! blocks of firework ids.

use crate::error::LaunchPadError;
use launchpad_storage::Store;

/// Hands out non-overlapping firework id ranges.
pub struct IdAssigner<'a> {
    store: &'a dyn Store,
}

impl<'a> IdAssigner<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Reserve `n` consecutive ids and return the first one.
    pub fn next_id(&self, n: i64) -> Result<i64, LaunchPadError> {
        Ok(self.store.next_id(n)?)
    }

    /// Replace the counter outright, e.g. when restoring a backup.
    pub fn reset(&self, v: i64) -> Result<(), LaunchPadError> {
        Ok(self.store.reset_counter(v)?)
    }
}

#[cfg(test)]
#[path = "id_assigner_tests.rs"]
mod tests;
