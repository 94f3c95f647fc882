// Copyright (c) 2022-2023 The MobileCoin Foundation

//! MIFARE Classic keys and per-sector key maps

use alloc::collections::BTreeMap;
use core::{fmt, str::FromStr};

use strum::{Display, EnumIter, EnumString};

/// Key length in bytes
pub const KEY_LEN: usize = 6;

/// 6-byte MIFARE Classic sector key
///
/// Displays as 12 upper-case hex characters, the format used in dump
/// and key files.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(pub [u8; KEY_LEN]);

impl Key {
    /// Factory default (transport) key
    pub const DEFAULT: Key = Key([0xFF; KEY_LEN]);

    pub const fn new(b: [u8; KEY_LEN]) -> Self {
        Self(b)
    }

    pub const fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl From<[u8; KEY_LEN]> for Key {
    fn from(b: [u8; KEY_LEN]) -> Self {
        Self(b)
    }
}

/// Parse a key from 12 hex characters (either case)
impl FromStr for Key {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut b = [0u8; KEY_LEN];
        hex::decode_to_slice(s.trim(), &mut b)?;
        Ok(Self(b))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02X}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({self})")
    }
}

/// Role a key is presented in when authenticating
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumString, EnumIter)]
pub enum KeyType {
    A,
    B,
}

/// Keys known for a single sector
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct SectorKeys {
    pub a: Option<Key>,
    pub b: Option<Key>,
}

impl SectorKeys {
    pub const fn new(a: Option<Key>, b: Option<Key>) -> Self {
        Self { a, b }
    }

    /// Fetch the key for the provided role
    pub const fn get(&self, key_type: KeyType) -> Option<Key> {
        match key_type {
            KeyType::A => self.a,
            KeyType::B => self.b,
        }
    }

    /// No key known for this sector
    pub const fn is_empty(&self) -> bool {
        self.a.is_none() && self.b.is_none()
    }
}

/// Sector to [SectorKeys] mapping, as produced by key mapping a tag.
///
/// Sectors without any key are treated as absent.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct KeyMap {
    sectors: BTreeMap<u8, SectorKeys>,
}

impl KeyMap {
    pub const fn new() -> Self {
        Self {
            sectors: BTreeMap::new(),
        }
    }

    /// Set keys for a sector, replacing any prior entry
    pub fn insert(&mut self, sector: u8, keys: SectorKeys) {
        if keys.is_empty() {
            self.sectors.remove(&sector);
        } else {
            self.sectors.insert(sector, keys);
        }
    }

    /// Fetch keys for a sector (`None` where no key was found)
    pub fn get(&self, sector: u8) -> Option<&SectorKeys> {
        self.sectors.get(&sector)
    }

    /// Iterate over mapped sectors in ascending order
    pub fn iter(&self) -> impl Iterator<Item = (u8, &SectorKeys)> {
        self.sectors.iter().map(|(s, k)| (*s, k))
    }

    pub fn len(&self) -> usize {
        self.sectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }
}

impl FromIterator<(u8, SectorKeys)> for KeyMap {
    fn from_iter<T: IntoIterator<Item = (u8, SectorKeys)>>(iter: T) -> Self {
        let mut m = Self::new();
        for (s, k) in iter {
            m.insert(s, k);
        }
        m
    }
}
