// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Clone a dump onto a tag.
//!
//! Every known block of the dump is requested, including the manufacturer
//! block, unwritable blocks are skipped by the [engine][crate::engine].

use alloc::vec::Vec;

use crate::{
    dump::{Dump, Position},
    engine::{resolve, WritePlan},
    keys::KeyMap,
    session::TagSession,
    writer::{execute_with_progress, Progress},
    Error,
};

/// Summary of a completed clone
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct CloneReport {
    /// Positions with a known payload in the dump
    pub requested: usize,
    /// Positions planned for writing
    pub planned: usize,
    /// Positions excluded from the plan
    pub skipped: usize,
    /// Blocks written
    pub written: usize,
}

/// Outcome of [clone_dump]
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum CloneOutcome {
    /// Plan executed
    Written(CloneReport),
    /// Nothing in the dump is writable with the keys available
    NothingToWrite { requested: usize },
}

/// Check the dump fits the tag, classify the dump positions and build
/// a [WritePlan].
///
/// Classification is re-read from the tag on each call as access
/// conditions may have changed since the last attempt.
pub fn prepare<S: TagSession + ?Sized>(
    dump: &Dump,
    keys: &KeyMap,
    session: &mut S,
) -> Result<WritePlan, Error> {
    // A session without sectors has no tag behind it
    let sectors = session.sector_count();
    if sectors == 0 {
        return Err(Error::TagLost);
    }

    // Refuse tags without room for the highest dump sector
    if let Some(max) = dump.max_sector() {
        if sectors <= max as usize {
            return Err(Error::TagTooSmall {
                sectors,
                required: max as usize + 1,
            });
        }
    }

    let requested: Vec<Position> = dump.known_positions().collect();
    let classification = session.classify(&requested, keys)?;

    Ok(resolve(requested, &classification, keys))
}

/// Write all writable dump blocks to the tag
pub fn clone_dump<S: TagSession + ?Sized>(
    dump: &Dump,
    keys: &KeyMap,
    session: &mut S,
    on_progress: impl FnMut(Progress),
) -> Result<CloneOutcome, Error> {
    let plan = prepare(dump, keys, session)?;

    if plan.is_empty() {
        #[cfg(feature = "log")]
        log::info!("Nothing to write ({} blocks requested)", plan.requested());

        return Ok(CloneOutcome::NothingToWrite {
            requested: plan.requested(),
        });
    }

    let written = execute_with_progress(&plan, dump, session, on_progress)?;

    Ok(CloneOutcome::Written(CloneReport {
        requested: plan.requested(),
        planned: plan.len(),
        skipped: plan.skipped(),
        written,
    }))
}
