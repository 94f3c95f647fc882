// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Tag session collaborator interface
//!
//! Implemented by whatever owns the live tag (NFC reader, simulator),
//! the engine only issues blocking calls through [TagSession].

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum::{Display, EnumIter};

use crate::{
    dump::{Block, Position},
    engine::Classification,
    keys::{Key, KeyMap, KeyType},
    Error,
};

/// Live tag session.
///
/// Sessions are not thread-safe, a single owner drives all operations.
pub trait TagSession {
    /// Number of sectors on the tag
    fn sector_count(&self) -> usize;

    /// Classify how each requested position may be written, given the
    /// tag's current access conditions and the available keys.
    ///
    /// Fails with [`Error::TagLost`] if the tag is no longer reachable.
    fn classify(&mut self, positions: &[Position], keys: &KeyMap)
        -> Result<Classification, Error>;

    /// Authenticate with `key` in the role `key_type` and write one block
    fn write_block(
        &mut self,
        pos: Position,
        data: &Block,
        key: &Key,
        key_type: KeyType,
    ) -> Result<(), WriteFault>;

    /// Close the session, subsequent operations fail as if the tag was lost
    fn close(&mut self);
}

impl<T: TagSession + ?Sized> TagSession for &mut T {
    fn sector_count(&self) -> usize {
        T::sector_count(self)
    }

    fn classify(
        &mut self,
        positions: &[Position],
        keys: &KeyMap,
    ) -> Result<Classification, Error> {
        T::classify(self, positions, keys)
    }

    fn write_block(
        &mut self,
        pos: Position,
        data: &Block,
        key: &Key,
        key_type: KeyType,
    ) -> Result<(), WriteFault> {
        T::write_block(self, pos, data, key, key_type)
    }

    fn close(&mut self) {
        T::close(self)
    }
}

/// Non-zero block write results
#[derive(
    Copy, Clone, PartialEq, Eq, Debug, Display, EnumIter, TryFromPrimitive, IntoPrimitive,
)]
#[repr(i8)]
pub enum WriteFault {
    /// Communication with the tag lost
    TagLost = -1,
    /// Sector or block does not exist on the tag
    OutOfRange = 1,
    /// Authentication with the provided key failed
    AuthFailed = 2,
    /// Tag refused the write (access conditions, read-only block)
    Rejected = 3,
}

impl WriteFault {
    /// Map a raw collaborator status code, `0` indicating success.
    ///
    /// Unrecognised codes are reported as [`WriteFault::Rejected`].
    pub fn check(code: i8) -> Result<(), WriteFault> {
        match code {
            0 => Ok(()),
            c => Err(WriteFault::try_from(c).unwrap_or(WriteFault::Rejected)),
        }
    }
}
