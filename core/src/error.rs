// Copyright (c) 2022-2023 The MobileCoin Foundation

use core::fmt;

use crate::{dump::Position, session::WriteFault};

/// Clone engine errors
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "thiserror", derive(thiserror::Error))]
pub enum Error {
    /// Dump failed structural checks
    #[cfg_attr(feature = "thiserror", error("malformed dump (line {line}): {kind}"))]
    MalformedDump { line: usize, kind: MalformedKind },

    /// Communication with the tag was lost
    #[cfg_attr(feature = "thiserror", error("tag lost"))]
    TagLost,

    /// Tag has fewer sectors than the dump requires
    #[cfg_attr(
        feature = "thiserror",
        error("tag too small ({sectors} sectors, dump requires {required})")
    )]
    TagTooSmall { sectors: usize, required: usize },

    /// Planned block has no payload in the dump
    #[cfg_attr(feature = "thiserror", error("no payload for planned block {0}"))]
    MissingPayload(Position),

    /// Block write failed on every attempt, the batch was aborted
    #[cfg_attr(
        feature = "thiserror",
        error("write failed (sector: {sector}, block: {block}): {fault}")
    )]
    WriteFailed {
        sector: u8,
        block: u8,
        fault: WriteFault,
    },
}

impl Error {
    /// Helper to build a [`Error::MalformedDump`]
    pub(crate) const fn malformed(line: usize, kind: MalformedKind) -> Self {
        Self::MalformedDump { line, kind }
    }

    /// Position of the aborted write, if any
    pub fn failed_position(&self) -> Option<Position> {
        match self {
            Self::WriteFailed { sector, block, .. } => Some(Position::new(*sector, *block)),
            _ => None,
        }
    }

    /// Check whether this error stems from losing the tag
    /// (as opposed to the tag rejecting an operation)
    pub fn is_tag_lost(&self) -> bool {
        matches!(
            self,
            Self::TagLost
                | Self::WriteFailed {
                    fault: WriteFault::TagLost,
                    ..
                }
        )
    }
}

/// Structural dump violations
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum MalformedKind {
    /// Block line before the first sector header
    BlockOutsideSector,
    /// Sector header without a valid sector number
    InvalidSectorHeader,
    /// Sector header repeated
    DuplicateSector(u8),
    /// Sector header with no blocks following
    EmptySector(u8),
    /// Block line is not 32 characters
    InvalidLength(usize),
    /// Block line contains characters other than hex digits and `-`
    InvalidHex,
    /// More blocks than a sector can hold
    TooManyBlocks,
}

impl fmt::Display for MalformedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BlockOutsideSector => write!(f, "block outside of a sector"),
            Self::InvalidSectorHeader => write!(f, "invalid sector header"),
            Self::DuplicateSector(s) => write!(f, "duplicate sector {s}"),
            Self::EmptySector(s) => write!(f, "sector {s} has no blocks"),
            Self::InvalidLength(n) => write!(f, "invalid block length {n}"),
            Self::InvalidHex => write!(f, "invalid hex"),
            Self::TooManyBlocks => write!(f, "too many blocks in sector"),
        }
    }
}
