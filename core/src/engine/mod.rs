// Copyright (c) 2022-2023 The MobileCoin Foundation

//! The write-authorization engine decides which requested positions can
//! be written, and with which key.
//!
//! Decisions are made independently per position from the tag's
//! [WriteAccess] classification and the caller's [KeyMap]. Positions that
//! cannot be written are dropped from the resulting [WritePlan] rather than
//! failing the operation, see [WritePlan::skipped].

use alloc::collections::BTreeSet;

use crate::{dump::Position, keys::KeyMap};

mod access;
pub use access::{Classification, WriteAccess};

mod plan;
pub use plan::{PlannedWrite, WritePlan};

/// Resolve the writable subset of `requested` positions.
///
/// A position is planned only where its sector has at least one key in
/// `keys` and its classification permits a write with an available key.
/// This is a pure function of its inputs, no position receives special
/// treatment (including the manufacturer block).
pub fn resolve(
    requested: impl IntoIterator<Item = Position>,
    classification: &Classification,
    keys: &KeyMap,
) -> WritePlan {
    let requested: BTreeSet<Position> = requested.into_iter().collect();
    let mut plan = WritePlan::with_requested(requested.len());

    for pos in requested {
        // Sectors without keys are skipped entirely
        let sector_keys = match keys.get(pos.sector) {
            Some(k) => k,
            None => {
                #[cfg(feature = "log")]
                log::debug!("Skipping {}: no keys for sector", pos);
                continue;
            }
        };

        let access = classification.get(pos);
        match access.select(sector_keys) {
            Some((key, key_type)) => {
                #[cfg(feature = "log")]
                log::trace!("Planned {} ({}): key {} as {}", pos, access, key, key_type);

                plan.insert(pos, PlannedWrite { key, key_type });
            }
            None => {
                #[cfg(feature = "log")]
                log::debug!("Skipping {}: {} with available keys", pos, access);
            }
        }
    }

    #[cfg(feature = "log")]
    log::debug!(
        "Write plan: {} of {} blocks ({} skipped)",
        plan.len(),
        plan.requested(),
        plan.skipped()
    );

    plan
}
