// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide, immutable LaunchPad configuration.
//!
//! Loading a TOML blob from disk or the CLI is an external collaborator's
//! job; this crate only knows how to parse one once handed a string.

use crate::error::LaunchPadError;
use serde::Deserialize;

/// Settings fixed for the lifetime of a `LaunchPad` instance.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LaunchPadConfig {
    /// FIFO (`true`) or FILO (`false`) tiebreak on `created_on` during dispatch.
    pub sort_fws: bool,
    pub reservation_expiration_secs: u64,
    pub run_expiration_secs: u64,
    pub wflock_expiration_secs: u64,
    /// Force-take a workflow lock once `wflock_expiration_secs` elapses,
    /// rather than surfacing `LockedWorkflow`.
    pub wflock_expiration_kill: bool,
    /// Advisory hint passed to the store adapter's connection layer; the
    /// in-memory store ignores it.
    pub mongo_socket_timeout_ms: u64,
    pub blob_collection_name: String,
}

impl Default for LaunchPadConfig {
    fn default() -> Self {
        Self {
            sort_fws: true,
            reservation_expiration_secs: 60 * 60 * 2,
            run_expiration_secs: 60 * 60 * 2,
            wflock_expiration_secs: 300,
            wflock_expiration_kill: false,
            mongo_socket_timeout_ms: 5_000,
            blob_collection_name: "launchpad_fw_blobs".to_string(),
        }
    }
}

impl LaunchPadConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, LaunchPadError> {
        toml::from_str(s).map_err(|e| LaunchPadError::ConfigError(e.to_string()))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
