// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Sector trailer access conditions
//!
//! Trailer bytes 6..9 hold the C1 / C2 / C3 bits for each of the four
//! block groups of a sector, along with their inverse:
//!
//! ```text
//! byte 6: !C2[3..0] !C1[3..0]
//! byte 7:  C1[3..0] !C3[3..0]
//! byte 8:  C3[3..0]  C2[3..0]
//! ```

use bitflags::bitflags;
use strum::Display;

use mct_core::{engine::WriteAccess, KeyType};

bitflags! {
    /// Access condition bits for one block group
    pub struct Access: u8 {
        const C1 = 0b100;
        const C2 = 0b010;
        const C3 = 0b001;
    }
}

/// Keys permitted to perform an operation
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display)]
pub enum Permission {
    Never,
    KeyA,
    KeyB,
    Both,
}

impl Permission {
    /// Check whether `key_type` grants this permission
    pub const fn allows(self, key_type: KeyType) -> bool {
        matches!(
            (self, key_type),
            (Self::Both, _) | (Self::KeyA, KeyType::A) | (Self::KeyB, KeyType::B)
        )
    }

    /// Drop Key B, used where Key B is readable and thus unusable
    const fn without_b(self) -> Self {
        match self {
            Self::KeyB => Self::Never,
            Self::Both => Self::KeyA,
            p => p,
        }
    }
}

/// Decoded access conditions for a sector
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct AccessConditions([Access; 4]);

/// Index of the trailer group
const TRAILER: usize = 3;

impl AccessConditions {
    /// Factory configuration (`FF0780`), data blocks writable with either
    /// key, trailer writable with Key A
    pub const TRANSPORT: Self = Self([
        Access::empty(),
        Access::empty(),
        Access::empty(),
        Access::C3,
    ]);

    pub const fn new(groups: [Access; 4]) -> Self {
        Self(groups)
    }

    /// Decode access bytes (trailer bytes 6..9), `None` where the inverted
    /// copies do not match
    pub fn decode(b: &[u8]) -> Option<Self> {
        let (b6, b7, b8) = (*b.first()?, *b.get(1)?, *b.get(2)?);

        let (c1, c2, c3) = (b7 >> 4, b8 & 0x0f, b8 >> 4);
        if c1 != !b6 & 0x0f || c2 != (!b6 >> 4) & 0x0f || c3 != !b7 & 0x0f {
            return None;
        }

        let mut groups = [Access::empty(); 4];
        for (i, g) in groups.iter_mut().enumerate() {
            let bits = ((c1 >> i) & 1) << 2 | ((c2 >> i) & 1) << 1 | ((c3 >> i) & 1);
            *g = Access::from_bits_truncate(bits);
        }

        Some(Self(groups))
    }

    /// Encode to access bytes
    pub fn encode(&self) -> [u8; 3] {
        let (mut c1, mut c2, mut c3) = (0u8, 0u8, 0u8);
        for (i, g) in self.0.iter().enumerate() {
            c1 |= (g.contains(Access::C1) as u8) << i;
            c2 |= (g.contains(Access::C2) as u8) << i;
            c3 |= (g.contains(Access::C3) as u8) << i;
        }

        [
            (!c2 & 0x0f) << 4 | (!c1 & 0x0f),
            c1 << 4 | (!c3 & 0x0f),
            c3 << 4 | c2,
        ]
    }

    /// Access bits for a block group (0..=2 data, 3 trailer)
    pub fn group(&self, group: usize) -> Access {
        self.0[group]
    }

    /// Key B can be read from the trailer, and cannot be used
    /// for authentication
    pub fn key_b_readable(&self) -> bool {
        let t = self.0[TRAILER].bits();
        matches!(t, 0b000 | 0b010 | 0b001)
    }

    /// Write permission for a data block group
    pub fn data_write(&self, group: usize) -> Permission {
        let p = match self.0[group].bits() {
            0b000 => Permission::Both,
            0b100 | 0b110 | 0b011 => Permission::KeyB,
            _ => Permission::Never,
        };

        match self.key_b_readable() {
            true => p.without_b(),
            false => p,
        }
    }

    /// Write permissions for the trailer, `(keys, access bits)`
    pub fn trailer_write(&self) -> (Permission, Permission) {
        match self.0[TRAILER].bits() {
            0b000 => (Permission::KeyA, Permission::Never),
            0b001 => (Permission::KeyA, Permission::KeyA),
            0b100 => (Permission::KeyB, Permission::Never),
            0b011 => (Permission::KeyB, Permission::KeyB),
            0b101 => (Permission::Never, Permission::KeyB),
            _ => (Permission::Never, Permission::Never),
        }
    }

    /// Classify writes to a data block group
    pub fn classify_data(&self, group: usize) -> WriteAccess {
        match self.data_write(group) {
            Permission::Never => WriteAccess::Never,
            Permission::KeyA => WriteAccess::KeyA,
            Permission::KeyB => WriteAccess::KeyB,
            Permission::Both => WriteAccess::KeyAOrB,
        }
    }

    /// Classify writes to the sector trailer
    pub fn classify_trailer(&self) -> WriteAccess {
        match self.trailer_write() {
            (Permission::KeyA, _) => WriteAccess::TrailerKeyA,
            (Permission::KeyB, Permission::KeyB) => WriteAccess::TrailerKeyB,
            (Permission::KeyB, _) | (_, Permission::KeyB) => WriteAccess::TrailerKeyBPartial,
            _ => WriteAccess::Never,
        }
    }
}
