// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Dump model, parsed from the textual dump format
//!
//! ```text
//! +Sector: 0
//! 0102030404080400626364656667686A
//! ...
//! FFFFFFFFFFFFFF078069FFFFFFFFFFFF
//! ```
//!
//! Each `+Sector: N` header opens a sector, every following line is one
//! 16 byte block (32 hex characters). Lines containing `-` mark bytes that
//! could not be read. The last block before the next header (or the end
//! of input) is the sector trailer, holding Key A, the access conditions
//! and Key B.

use alloc::{
    collections::{BTreeMap, BTreeSet},
    vec::Vec,
};
use core::{fmt, str::FromStr};

use crate::{
    error::{Error, MalformedKind},
    keys::Key,
};

/// Block length in bytes
pub const BLOCK_LEN: usize = 16;

/// Maximum number of blocks in a (4K large) sector
pub const MAX_BLOCKS_PER_SECTOR: usize = 16;

/// Raw block payload
pub type Block = [u8; BLOCK_LEN];

/// Sector header prefix
const SECTOR_MARKER: &str = "+Sector:";

/// Marker for unknown / unreadable bytes
const PLACEHOLDER: char = '-';

/// Key A hex range within a trailer line
const KEY_A_RANGE: core::ops::Range<usize> = 0..12;

/// Key B hex range within a trailer line
const KEY_B_RANGE: core::ops::Range<usize> = 20..32;

/// Block position on a tag, `block` is relative to the start of the sector.
///
/// Orders by sector then block, which is the order writes are executed in.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Position {
    pub sector: u8,
    pub block: u8,
}

impl Position {
    pub const fn new(sector: u8, block: u8) -> Self {
        Self { sector, block }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.sector, self.block)
    }
}

/// Content recorded for a block position
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum BlockContent {
    /// Block read successfully
    Data(Block),
    /// Block present but content unknown
    Unknown,
}

impl BlockContent {
    /// Fetch block payload where known
    pub const fn data(&self) -> Option<&Block> {
        match self {
            Self::Data(b) => Some(b),
            Self::Unknown => None,
        }
    }
}

/// Parsed dump, immutable once loaded
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Dump {
    /// Blocks per sector, indexed by block
    sectors: BTreeMap<u8, Vec<BlockContent>>,
    /// Keys harvested from sector trailers
    keys: BTreeSet<Key>,
}

impl Dump {
    /// Parse a dump from an ordered sequence of lines.
    ///
    /// Blank lines and surrounding whitespace are ignored.
    pub fn parse<'a>(lines: impl IntoIterator<Item = &'a str>) -> Result<Self, Error> {
        let mut sectors: BTreeMap<u8, Vec<BlockContent>> = BTreeMap::new();
        let mut keys = BTreeSet::new();
        // Current sector and the line its header was found on
        let mut current: Option<(u8, usize)> = None;

        let mut lines = lines
            .into_iter()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty())
            .peekable();

        while let Some((n, line)) = lines.next() {
            // Sector header, open a new sector
            if let Some(header) = line.strip_prefix(SECTOR_MARKER) {
                check_not_empty(&sectors, current)?;

                let sector = header
                    .trim()
                    .parse::<u8>()
                    .map_err(|_| Error::malformed(n, MalformedKind::InvalidSectorHeader))?;

                if sectors.insert(sector, Vec::new()).is_some() {
                    return Err(Error::malformed(n, MalformedKind::DuplicateSector(sector)));
                }

                current = Some((sector, n));
                continue;
            }

            // Otherwise this is a block within the current sector
            let blocks = match current.and_then(|(s, _)| sectors.get_mut(&s)) {
                Some(v) => v,
                None => return Err(Error::malformed(n, MalformedKind::BlockOutsideSector)),
            };

            if !line.chars().all(|c| c.is_ascii_hexdigit() || c == PLACEHOLDER) {
                return Err(Error::malformed(n, MalformedKind::InvalidHex));
            }
            if line.len() != BLOCK_LEN * 2 {
                return Err(Error::malformed(n, MalformedKind::InvalidLength(line.len())));
            }
            if blocks.len() >= MAX_BLOCKS_PER_SECTOR {
                return Err(Error::malformed(n, MalformedKind::TooManyBlocks));
            }

            // Trailer detection is positional, the last block of each sector
            let is_trailer = match lines.peek() {
                Some((_, next)) => next.starts_with(SECTOR_MARKER),
                None => true,
            };
            if is_trailer {
                for r in [KEY_A_RANGE, KEY_B_RANGE] {
                    let segment = &line[r];
                    if segment.contains(PLACEHOLDER) {
                        continue;
                    }
                    let k = Key::from_str(segment)
                        .map_err(|_| Error::malformed(n, MalformedKind::InvalidHex))?;
                    keys.insert(k);
                }
            }

            let content = match line.contains(PLACEHOLDER) {
                true => BlockContent::Unknown,
                false => {
                    let mut b = [0u8; BLOCK_LEN];
                    hex::decode_to_slice(line, &mut b)
                        .map_err(|_| Error::malformed(n, MalformedKind::InvalidHex))?;
                    BlockContent::Data(b)
                }
            };
            blocks.push(content);
        }

        check_not_empty(&sectors, current)?;

        #[cfg(feature = "log")]
        log::debug!(
            "Parsed dump with {} sectors, {} embedded keys",
            sectors.len(),
            keys.len()
        );

        Ok(Self { sectors, keys })
    }

    /// Unique keys embedded in the sector trailers (may be empty)
    pub fn extracted_keys(&self) -> &BTreeSet<Key> {
        &self.keys
    }

    /// Sector indices in ascending order
    pub fn sectors(&self) -> impl Iterator<Item = u8> + '_ {
        self.sectors.keys().copied()
    }

    /// Blocks recorded for a sector
    pub fn sector(&self, sector: u8) -> Option<&[BlockContent]> {
        self.sectors.get(&sector).map(|v| v.as_slice())
    }

    /// Content recorded for a position
    pub fn block(&self, pos: Position) -> Option<&BlockContent> {
        self.sectors
            .get(&pos.sector)
            .and_then(|b| b.get(pos.block as usize))
    }

    /// Positions with a known payload, in ascending order
    pub fn known_positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.sectors.iter().flat_map(|(s, blocks)| {
            blocks
                .iter()
                .enumerate()
                .filter(|(_, c)| c.data().is_some())
                .map(move |(b, _)| Position::new(*s, b as u8))
        })
    }

    /// Highest sector index in the dump
    pub fn max_sector(&self) -> Option<u8> {
        self.sectors.keys().next_back().copied()
    }

    /// Number of sectors in the dump
    pub fn len(&self) -> usize {
        self.sectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }
}

/// Reject a sector header that is not followed by any block
fn check_not_empty(
    sectors: &BTreeMap<u8, Vec<BlockContent>>,
    current: Option<(u8, usize)>,
) -> Result<(), Error> {
    match current {
        Some((s, line)) if sectors.get(&s).map_or(true, |b| b.is_empty()) => {
            Err(Error::malformed(line, MalformedKind::EmptySector(s)))
        }
        _ => Ok(()),
    }
}
