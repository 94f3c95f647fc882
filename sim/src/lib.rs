// Copyright (c) 2022-2023 The MobileCoin Foundation

//! In-memory MIFARE Classic tag
//!
//! [SimTag] implements [TagSession][mct_core::session::TagSession] over an
//! in-memory 1K or 4K tag image, enforcing keys and access conditions on
//! writes the way a physical tag does. This supports exercising the clone
//! engine (and the `mct-clone` CLI) without NFC hardware.

pub mod access;

mod tag;
pub use tag::{Layout, SimTag, WriteRecord};

/// Simulator errors
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    /// Dump has more sectors than any supported layout
    #[error("unsupported tag layout ({0} sectors)")]
    UnsupportedLayout(usize),

    /// Dump sector block count does not match the tag layout
    #[error("sector {sector} has {actual} blocks (expected {expected})")]
    SectorSize {
        sector: u8,
        expected: usize,
        actual: usize,
    },

    /// Tag image block unknown
    #[error("block {0} content unknown")]
    Incomplete(mct_core::Position),

    /// Position does not exist on the tag
    #[error("block {0} out of range")]
    OutOfRange(mct_core::Position),
}
