// Copyright (c) 2022-2023 The MobileCoin Foundation

use alloc::collections::BTreeMap;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum::{Display, EnumIter};

use crate::{
    dump::Position,
    keys::{Key, KeyType, SectorKeys},
};

/// Tag-derived classification of how a block may be written given its
/// sector's access conditions.
///
/// The numeric values match the codes reported by tag readers.
#[derive(
    Copy, Clone, PartialEq, Eq, Debug, Display, EnumIter, TryFromPrimitive, IntoPrimitive,
)]
#[repr(i8)]
pub enum WriteAccess {
    /// Position invalid or unreadable
    Invalid = -1,
    /// Never writable
    Never = 0,
    /// Writable with Key A only
    KeyA = 1,
    /// Writable with Key B only
    KeyB = 2,
    /// Writable with either key
    KeyAOrB = 3,
    /// Sector trailer writable with Key A
    TrailerKeyA = 4,
    /// Sector trailer writable with Key B
    TrailerKeyB = 5,
    /// Sector trailer partially writable with Key B (keys or access bits locked)
    TrailerKeyBPartial = 6,
}

impl WriteAccess {
    /// Select the key to write with from the available sector keys,
    /// `None` where the write is not possible.
    ///
    /// Key A is preferred where either key may be used.
    pub fn select(self, keys: &SectorKeys) -> Option<(Key, KeyType)> {
        let a = keys.a.map(|k| (k, KeyType::A));
        let b = keys.b.map(|k| (k, KeyType::B));

        match self {
            Self::Invalid | Self::Never => None,
            Self::KeyA | Self::TrailerKeyA => a,
            Self::KeyB | Self::TrailerKeyB | Self::TrailerKeyBPartial => b,
            Self::KeyAOrB => a.or(b),
        }
    }
}

/// Per-position [WriteAccess], as reported by the tag
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Classification(BTreeMap<Position, WriteAccess>);

impl Classification {
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Build from raw reader codes, unknown codes are treated as
    /// [`WriteAccess::Invalid`]
    pub fn from_codes(codes: impl IntoIterator<Item = (Position, i8)>) -> Self {
        codes
            .into_iter()
            .map(|(p, c)| {
                let a = WriteAccess::try_from(c).unwrap_or_else(|_| {
                    #[cfg(feature = "log")]
                    log::warn!("Unknown write classification {} for {}", c, p);
                    WriteAccess::Invalid
                });
                (p, a)
            })
            .collect()
    }

    pub fn insert(&mut self, pos: Position, access: WriteAccess) {
        self.0.insert(pos, access);
    }

    /// Fetch classification for a position, positions the tag did not
    /// classify are [`WriteAccess::Invalid`]
    pub fn get(&self, pos: Position) -> WriteAccess {
        self.0.get(&pos).copied().unwrap_or(WriteAccess::Invalid)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Position, WriteAccess)> + '_ {
        self.0.iter().map(|(p, a)| (*p, *a))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Position, WriteAccess)> for Classification {
    fn from_iter<T: IntoIterator<Item = (Position, WriteAccess)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
