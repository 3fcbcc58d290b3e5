// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The durable store adapter for LaunchPad: a write-ahead log of
//! [`StoreOp`]s folded into a materialized [`StoreState`], checkpointed to
//! zstd-compressed snapshots, plus the index and blob side-channel
//! bookkeeping the store-adapter contract requires. [`InMemoryStore`] is
//! the concrete [`Store`] this crate ships; anything implementing the
//! `Store` trait directly (a real document database, say) is equally
//! valid to the engine layer above.

mod blob;
mod checkpoint;
mod error;
mod indexes;
mod memstore;
mod migration;
mod ops;
mod snapshot;
mod state;
mod store;
mod wal;

pub use blob::{BlobError, BlobMetadata, BlobStore, FsBlobStore, MemBlobStore};
pub use checkpoint::{
    CheckpointError, CheckpointHandle, CheckpointResult, CheckpointWriter, Checkpointer,
    FsCheckpointWriter, load_snapshot,
};
pub use error::StoreError;
pub use indexes::{
    IndexRegistry, IndexSpec, TuneupResult, dispatch_sort, required_firework_indexes,
    required_workflow_indexes,
};
pub use memstore::InMemoryStore;
pub use migration::{Migration, MigrationError, MigrationRegistry};
pub use ops::StoreOp;
pub use snapshot::{CURRENT_SNAPSHOT_VERSION, Snapshot, SnapshotError};
pub use state::StoreState;
pub use store::{FwUpdateOp, Store};
pub use wal::{Wal, WalEntry, WalError};
