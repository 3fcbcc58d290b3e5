// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store-layer error taxonomy: the members owned by the store adapter
//! rather than the engine (`NotFound`, `DocumentTooLarge`, `DuplicateKey`).
//! `LockedWorkflow`/`InternalRefresh`/`ConfigError` live in
//! `launchpad-engine`, which is where those conditions are detected.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no document matching {0}")]
    NotFound(String),

    /// The store rejected a write because the serialized document exceeds
    /// its per-document limit. Carries the offending document's byte length
    /// for diagnostics.
    #[error("document too large ({size_bytes} bytes)")]
    DocumentTooLarge { size_bytes: usize },

    /// Unique index violation on `(fw_id, launch_idx)`.
    #[error("duplicate key: fw_id={fw_id} launch_idx={launch_idx}")]
    DuplicateKey { fw_id: i64, launch_idx: i32 },

    /// `count_only=true` combined with a non-zero `limit`: raised here
    /// rather than smuggled through as a silently wrong count.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// An action spilled to the blob store, but no blob store is configured.
    #[error("action exceeds document limit but no blob store is configured")]
    BlobStoreNotConfigured,

    #[error("blob not found: {0}")]
    BlobNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("wal error: {0}")]
    Wal(#[from] crate::wal::WalError),
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
