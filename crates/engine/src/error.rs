// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types surfaced by the engine facade.

use launchpad_storage::StoreError;
use thiserror::Error;

/// Errors that can occur while driving the dispatch/checkin/lock protocol.
#[derive(Debug, Error)]
pub enum LaunchPadError {
    #[error("no firework matching fw_id={fw_id}")]
    NotFound { fw_id: i64 },
    #[error("workflow containing fw_id={fw_id} is locked")]
    LockedWorkflow { fw_id: i64 },
    #[error("action for fw_id={fw_id} exceeds the document size limit ({size_bytes} bytes)")]
    DocumentTooLarge { fw_id: i64, size_bytes: usize },
    #[error("duplicate key: fw_id={fw_id} launch_idx={launch_idx}")]
    DuplicateKey { fw_id: i64, launch_idx: i32 },
    #[error("workflow refresh for fw_id={fw_id} could not converge: {message}")]
    InternalRefresh { fw_id: i64, message: String },
    #[error("invalid configuration: {0}")]
    ConfigError(String),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("{0}")]
    Core(#[from] launchpad_core::CoreError),
}
