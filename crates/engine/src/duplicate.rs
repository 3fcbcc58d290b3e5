// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Duplicate detection/theft: a Firework considered for dispatch may be
//! absorbed into an already-running equivalent rather than launched twice.

use crate::error::LaunchPadError;
use chrono::Utc;
use launchpad_core::{DupeFinderRegistry, Firework, FwState};
use launchpad_storage::Store;

/// Outcome of [`check_and_link`].
pub struct DupeCheck {
    /// `true` if `candidate` was absorbed into an already-claimed partner's
    /// duplicate set and should not be dispatched on its own.
    pub stolen: bool,
    /// The partner `candidate` was linked to, when a match was found.
    pub partner_fw_id: Option<i64>,
}

/// Run the duplicate engine against `candidate`: resolve its
/// `spec._dupefinder`, scan the store for matches, and on a confirmed
/// match, record bidirectional links and persist both documents.
///
/// A candidate with no `_dupefinder` configured, or whose named finder
/// isn't registered, is never a duplicate. A match only counts as
/// `stolen` when the partner is already claimed (anything past
/// WAITING/READY) — two mutually-matching candidates that are both still
/// unclaimed would otherwise steal each other forever. The caller is
/// expected to defuse a stolen candidate rather than return it to READY,
/// since READY would just make it eligible to be stolen again.
pub fn check_and_link(
    store: &dyn Store,
    registry: &DupeFinderRegistry,
    candidate: &mut Firework,
) -> Result<DupeCheck, LaunchPadError> {
    let Some(finder_name) = candidate.spec.get("_dupefinder").and_then(|v| v.as_str()) else {
        return Ok(DupeCheck { stolen: false, partner_fw_id: None });
    };
    let Some(finder) = registry.get(finder_name) else {
        return Ok(DupeCheck { stolen: false, partner_fw_id: None });
    };

    let query = finder.query(&candidate.spec);
    let candidates = store.find_fireworks(&query, None, None)?;
    let verifies_anything = finder
        .verify(&serde_json::Map::new(), &serde_json::Map::new())
        .is_some();

    for other in candidates {
        if other.fw_id == candidate.fw_id {
            continue;
        }
        let is_match = if verifies_anything {
            finder.verify(&candidate.spec, &other.spec).unwrap_or(false)
        } else {
            true
        };
        if !is_match {
            continue;
        }

        let mut other = other;
        candidate.add_duplicate(other.fw_id);
        other.add_duplicate(candidate.fw_id);
        other.updated_on = Utc::now();
        let already_claimed = !matches!(other.state, FwState::Waiting | FwState::Ready);
        store.find_one_and_replace_firework(other.clone())?;
        store.find_one_and_replace_firework(candidate.clone())?;

        return Ok(DupeCheck { stolen: already_claimed, partner_fw_id: Some(other.fw_id.get()) });
    }

    Ok(DupeCheck { stolen: false, partner_fw_id: None })
}

#[cfg(test)]
#[path = "duplicate_tests.rs"]
mod tests;
