// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Write orchestration, executes a [WritePlan] against a [TagSession].
//!
//! Writes are strictly sequential in ascending sector then block order, so
//! each sector trailer (the highest block) is written after the data it
//! protects. Each block is attempted [WRITE_ATTEMPTS] times, a block that
//! fails every attempt aborts the batch. There is no undo, blocks written
//! before the failure remain on the tag.

use alloc::vec::Vec;

use crate::{
    dump::{BlockContent, Dump, Position},
    engine::WritePlan,
    session::{TagSession, WriteFault},
    Error,
};

/// Write attempts per block (one retry)
pub const WRITE_ATTEMPTS: usize = 2;

/// Progress reported after each committed block
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Progress {
    /// Position just written
    pub position: Position,
    /// Number of blocks written so far (including this one)
    pub written: usize,
    /// Number of blocks in the plan
    pub total: usize,
}

/// Execute a write plan, returning the number of blocks written.
///
/// The session is left open for the caller to close.
pub fn execute<S: TagSession + ?Sized>(
    plan: &WritePlan,
    dump: &Dump,
    session: &mut S,
) -> Result<usize, Error> {
    execute_with_progress(plan, dump, session, |_| ())
}

/// Execute a write plan, calling `on_progress` after each block is written
pub fn execute_with_progress<S: TagSession + ?Sized>(
    plan: &WritePlan,
    dump: &Dump,
    session: &mut S,
    mut on_progress: impl FnMut(Progress),
) -> Result<usize, Error> {
    // Resolve payloads prior to touching the tag
    let mut writes = Vec::with_capacity(plan.len());
    for (pos, w) in plan.iter() {
        let data = match dump.block(pos).and_then(BlockContent::data) {
            Some(d) => d,
            None => return Err(Error::MissingPayload(pos)),
        };
        writes.push((pos, w, data));
    }

    let total = writes.len();

    #[cfg(feature = "log")]
    log::debug!("Writing {} blocks", total);

    for (i, (pos, w, data)) in writes.into_iter().enumerate() {
        let mut fault = WriteFault::Rejected;

        let ok = (0..WRITE_ATTEMPTS).any(|_attempt| {
            match session.write_block(pos, data, &w.key, w.key_type) {
                Ok(()) => true,
                Err(f) => {
                    #[cfg(feature = "log")]
                    log::warn!(
                        "Write {} failed (attempt {}/{}): {}",
                        pos,
                        _attempt + 1,
                        WRITE_ATTEMPTS,
                        f
                    );
                    fault = f;
                    false
                }
            }
        });

        if !ok {
            #[cfg(feature = "log")]
            log::warn!("Aborting write after {} of {} blocks", i, total);

            return Err(Error::WriteFailed {
                sector: pos.sector,
                block: pos.block,
                fault,
            });
        }

        on_progress(Progress {
            position: pos,
            written: i + 1,
            total,
        });
    }

    Ok(total)
}
