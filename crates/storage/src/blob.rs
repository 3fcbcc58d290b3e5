// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Blob side-store for oversize action payloads.
//!
//! `put` returns an opaque id; `get` resolves it back to bytes. Metadata
//! (`{fw_id, launch_idx}`) travels alongside the blob so an operator can
//! correlate a spillover with the firework that produced it.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob not found: {0}")]
    NotFound(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Metadata stamped on a spilled action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobMetadata {
    pub fw_id: i64,
    pub launch_idx: i32,
}

pub trait BlobStore: Send + Sync {
    fn put(&self, bytes: &[u8], metadata: BlobMetadata) -> Result<String, BlobError>;
    fn get(&self, id: &str) -> Result<Vec<u8>, BlobError>;
}

/// Filesystem-backed blob store: one file per blob under `root`, named by a
/// random id, with a `.meta.json` sidecar.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn data_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.blob"))
    }

    fn meta_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.meta.json"))
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, bytes: &[u8], metadata: BlobMetadata) -> Result<String, BlobError> {
        std::fs::create_dir_all(&self.root)?;
        let id = Uuid::new_v4().to_string();
        std::fs::write(self.data_path(&id), bytes)?;
        std::fs::write(self.meta_path(&id), serde_json::to_vec(&metadata)?)?;
        Ok(id)
    }

    fn get(&self, id: &str) -> Result<Vec<u8>, BlobError> {
        std::fs::read(self.data_path(id)).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BlobError::NotFound(id.to_string())
            } else {
                BlobError::Io(e)
            }
        })
    }
}

/// In-memory blob store, for tests and embedders that never intend to
/// survive a restart.
#[derive(Default)]
pub struct MemBlobStore {
    blobs: Mutex<HashMap<String, (Vec<u8>, BlobMetadata)>>,
}

impl MemBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemBlobStore {
    fn put(&self, bytes: &[u8], metadata: BlobMetadata) -> Result<String, BlobError> {
        let id = Uuid::new_v4().to_string();
        self.blobs.lock().insert(id.clone(), (bytes.to_vec(), metadata));
        Ok(id)
    }

    fn get(&self, id: &str) -> Result<Vec<u8>, BlobError> {
        self.blobs
            .lock()
            .get(id)
            .map(|(bytes, _)| bytes.clone())
            .ok_or_else(|| BlobError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
#[path = "blob_tests.rs"]
mod tests;
