// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `_recover`: surface the latest checkpoint of a firework's most recent
//! launch under `spec._recovery`, optionally restoring its prior launch
//! directory so a worker can resume in place.

use crate::error::LaunchPadError;
use chrono::Utc;
use launchpad_storage::Store;
use serde::{Deserialize, Serialize};

/// How the recovered checkpoint should be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryMode {
    /// Only surface the checkpoint; leave the launch directory untouched.
    CheckpointOnly,
    /// Also restore `spec._launch_dir` to the prior launch's directory.
    PrevDir,
}

impl RecoveryMode {
    fn as_str(&self) -> &'static str {
        match self {
            RecoveryMode::CheckpointOnly => "checkpoint_only",
            RecoveryMode::PrevDir => "prev_dir",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RecoveryInfo {
    checkpoint: serde_json::Value,
    prev_dir: Option<String>,
    launch_id: i32,
    mode: String,
}

/// Write `spec._recovery` from the last checkpoint of `fw_id`'s latest
/// launch. Returns `Ok(false)` without modifying anything if no checkpoint
/// is present in the state history.
pub fn recover(store: &dyn Store, fw_id: i64, mode: RecoveryMode) -> Result<bool, LaunchPadError> {
    let mut fw = store.get_firework(fw_id)?.ok_or(LaunchPadError::NotFound { fw_id })?;

    let Some(checkpoint) = fw.state_history.iter().rev().find_map(|e| e.checkpoint.clone()) else {
        return Ok(false);
    };

    let info = RecoveryInfo {
        checkpoint,
        prev_dir: fw.launch_dir.clone(),
        launch_id: fw.launch_idx.get(),
        mode: mode.as_str().to_string(),
    };
    let encoded = serde_json::to_value(&info).map_err(|e| LaunchPadError::InternalRefresh {
        fw_id,
        message: format!("failed to serialize recovery info: {e}"),
    })?;
    fw.spec.insert("_recovery".to_string(), encoded);

    if mode == RecoveryMode::PrevDir {
        if let Some(prev_dir) = info.prev_dir.clone() {
            fw.spec.insert("_launch_dir".to_string(), serde_json::json!(prev_dir));
        }
    }

    fw.updated_on = Utc::now();
    store.find_one_and_replace_firework(fw)?;
    Ok(true)
}

/// Clear `spec._recovery`, e.g. once a worker has consumed it.
pub fn clear_recovery(store: &dyn Store, fw_id: i64) -> Result<(), LaunchPadError> {
    let mut fw = store.get_firework(fw_id)?.ok_or(LaunchPadError::NotFound { fw_id })?;
    fw.spec.remove("_recovery");
    fw.updated_on = Utc::now();
    store.find_one_and_replace_firework(fw)?;
    Ok(())
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
