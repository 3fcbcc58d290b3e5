// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! launchpad-core: the in-memory Firework/Workflow data model, state
//! transition rules, and duplicate-detection policy contract underlying
//! LaunchPad. Storage, locking, and dispatch live in `launchpad-storage` and
//! `launchpad-engine`; this crate has no I/O.

pub mod clock;
pub mod dupefinder;
pub mod error;
pub mod firework;
pub mod id;
pub mod query;
pub mod state;
pub mod workflow;

pub use clock::{Clock, FakeClock, SystemClock};
pub use dupefinder::{DupeFinder, DupeFinderRegistry, ExactSpecDupeFinder};
pub use error::CoreError;
pub use firework::{ActionSlot, FWAction, Firework};
pub use id::{FireworkId, IdGen, LaunchIdx, ReservationId, SequentialIdGen, ShortId, UuidIdGen};
pub use query::{FieldOp, Query, Sort, SortDir};
pub use state::{FwState, StateHistoryEntry};
pub use workflow::{aggregate_state, Workflow};
