// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::collections::BTreeMap;

use log::{debug, trace};
use strum::{Display, EnumString};

use mct_core::{
    dump::{BlockContent, BLOCK_LEN},
    engine::{Classification, WriteAccess},
    session::{TagSession, WriteFault},
    Block, Dump, Key, KeyMap, KeyType, Position, SectorKeys,
};

use crate::{access::AccessConditions, Error};

/// Supported tag layouts
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumString)]
pub enum Layout {
    /// 16 sectors of 4 blocks
    #[strum(serialize = "1k")]
    Classic1k,
    /// 32 sectors of 4 blocks followed by 8 sectors of 16 blocks
    #[strum(serialize = "4k")]
    Classic4k,
}

impl Layout {
    pub const fn sector_count(&self) -> usize {
        match self {
            Self::Classic1k => 16,
            Self::Classic4k => 40,
        }
    }

    pub const fn blocks_in_sector(&self, sector: usize) -> usize {
        match sector < 32 {
            true => 4,
            false => 16,
        }
    }

    /// Smallest layout holding `sectors` sectors
    pub fn for_sectors(sectors: usize) -> Option<Self> {
        [Self::Classic1k, Self::Classic4k]
            .into_iter()
            .find(|l| sectors <= l.sector_count())
    }
}

/// Access condition group for a block within a sector
fn block_group(blocks_in_sector: usize, block: usize) -> usize {
    match (blocks_in_sector, block) {
        (4, b) => b,
        (n, b) if b == n - 1 => 3,
        (_, b) => b / 5,
    }
}

/// Record of a write attempt
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct WriteRecord {
    pub position: Position,
    pub key_type: KeyType,
    pub result: Result<(), WriteFault>,
}

/// Simulated MIFARE Classic tag
#[derive(Clone, Debug)]
pub struct SimTag {
    layout: Layout,
    /// Manufacturer block writable (gen1 "magic" tag)
    magic: bool,
    sectors: Vec<Vec<Block>>,
    connected: bool,
    /// Injected write faults, remaining count and fault
    faults: BTreeMap<Position, (usize, WriteFault)>,
    journal: Vec<WriteRecord>,
}

/// Manufacturer block for blank tags
const MANUFACTURER_BLOCK: Block = [
    0x01, 0x02, 0x03, 0x04, 0x04, 0x08, 0x04, 0x00, 0x62, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69,
];

/// Key A range within a trailer
const KEY_A: std::ops::Range<usize> = 0..6;
/// Access bits (and user byte) within a trailer
const ACCESS: std::ops::Range<usize> = 6..10;
/// Key B range within a trailer
const KEY_B: std::ops::Range<usize> = 10..16;

impl SimTag {
    /// Create a blank tag with transport keys and access conditions
    pub fn new(layout: Layout) -> Self {
        let mut trailer = [0u8; BLOCK_LEN];
        trailer[KEY_A].copy_from_slice(Key::DEFAULT.as_bytes());
        trailer[6..9].copy_from_slice(&AccessConditions::TRANSPORT.encode());
        trailer[9] = 0x69;
        trailer[KEY_B].copy_from_slice(Key::DEFAULT.as_bytes());

        let mut sectors: Vec<Vec<Block>> = (0..layout.sector_count())
            .map(|s| {
                let n = layout.blocks_in_sector(s);
                let mut blocks = vec![[0u8; BLOCK_LEN]; n];
                blocks[n - 1] = trailer;
                blocks
            })
            .collect();
        sectors[0][0] = MANUFACTURER_BLOCK;

        Self {
            layout,
            magic: false,
            sectors,
            connected: true,
            faults: BTreeMap::new(),
            journal: vec![],
        }
    }

    /// Create a tag from a dump image, sectors missing from the dump
    /// are left blank
    pub fn from_dump(dump: &Dump) -> Result<Self, Error> {
        let count = dump.max_sector().map_or(0, |s| s as usize + 1);
        let layout = Layout::for_sectors(count).ok_or(Error::UnsupportedLayout(count))?;

        let mut tag = Self::new(layout);
        for s in dump.sectors() {
            let blocks = dump.sector(s).unwrap_or_default();
            let expected = layout.blocks_in_sector(s as usize);
            if blocks.len() != expected {
                return Err(Error::SectorSize {
                    sector: s,
                    expected,
                    actual: blocks.len(),
                });
            }

            for (b, c) in blocks.iter().enumerate() {
                let pos = Position::new(s, b as u8);
                let data = match c {
                    BlockContent::Data(d) => d,
                    BlockContent::Unknown => return Err(Error::Incomplete(pos)),
                };
                tag.set_block(pos, data)?;
            }
        }

        debug!("Loaded {} tag image ({} sectors)", layout, dump.len());

        Ok(tag)
    }

    /// Set whether the manufacturer block is writable
    pub fn with_magic(mut self, magic: bool) -> Self {
        self.magic = magic;
        self
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Fetch a block (including keys, regardless of access conditions)
    pub fn block(&self, pos: Position) -> Option<&Block> {
        self.sectors
            .get(pos.sector as usize)
            .and_then(|b| b.get(pos.block as usize))
    }

    /// Set a block directly, bypassing authentication
    pub fn set_block(&mut self, pos: Position, data: &Block) -> Result<(), Error> {
        let b = self
            .sectors
            .get_mut(pos.sector as usize)
            .and_then(|b| b.get_mut(pos.block as usize))
            .ok_or(Error::OutOfRange(pos))?;
        *b = *data;
        Ok(())
    }

    /// Current keys for a sector
    pub fn sector_keys(&self, sector: u8) -> Option<(Key, Key)> {
        let t = self.trailer(sector as usize)?;
        Some((key_at(t, KEY_A), key_at(t, KEY_B)))
    }

    /// Current access conditions for a sector
    pub fn access(&self, sector: u8) -> Option<AccessConditions> {
        AccessConditions::decode(&self.trailer(sector as usize)?[6..9])
    }

    /// Remove the tag from the field, subsequent operations fail
    pub fn remove(&mut self) {
        debug!("Tag removed");
        self.connected = false;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Fail the next `count` writes to `pos` with `fault`
    pub fn fail_writes(&mut self, pos: Position, count: usize, fault: WriteFault) {
        self.faults.insert(pos, (count, fault));
    }

    /// Write attempts in the order they were issued
    pub fn journal(&self) -> &[WriteRecord] {
        &self.journal
    }

    /// Discover keys by matching candidates against each sector trailer
    pub fn map_keys<'a>(&self, candidates: impl IntoIterator<Item = &'a Key>) -> KeyMap {
        let candidates: Vec<&Key> = candidates.into_iter().collect();

        (0..self.sectors.len())
            .filter_map(|s| {
                let (a, b) = self.sector_keys(s as u8)?;
                let keys = SectorKeys::new(
                    candidates.iter().find(|k| ***k == a).map(|k| **k),
                    candidates.iter().find(|k| ***k == b).map(|k| **k),
                );
                trace!("Sector {} keys: {:?}", s, keys);
                Some((s as u8, keys))
            })
            .collect()
    }

    /// Export the tag image in dump format
    pub fn to_dump_lines(&self) -> Vec<String> {
        let mut lines = vec![];
        for (s, blocks) in self.sectors.iter().enumerate() {
            lines.push(format!("+Sector: {s}"));
            lines.extend(blocks.iter().map(hex::encode_upper));
        }
        lines
    }

    fn trailer(&self, sector: usize) -> Option<&Block> {
        self.sectors.get(sector).and_then(|b| b.last())
    }

    fn classify_one(&self, pos: Position, keys: &KeyMap) -> WriteAccess {
        if keys.get(pos.sector).is_none() {
            return WriteAccess::Invalid;
        }

        let n = match self.sectors.get(pos.sector as usize) {
            Some(b) if (pos.block as usize) < b.len() => b.len(),
            _ => return WriteAccess::Invalid,
        };
        let ac = match self.access(pos.sector) {
            Some(v) => v,
            None => return WriteAccess::Invalid,
        };

        match block_group(n, pos.block as usize) {
            3 => ac.classify_trailer(),
            g => ac.classify_data(g),
        }
    }

    fn try_write(
        &mut self,
        pos: Position,
        data: &Block,
        key: &Key,
        key_type: KeyType,
    ) -> Result<(), WriteFault> {
        if !self.connected {
            return Err(WriteFault::TagLost);
        }

        if let Some((n, fault)) = self.faults.get_mut(&pos) {
            if *n > 0 {
                *n -= 1;
                return Err(*fault);
            }
        }

        let (s, b) = (pos.sector as usize, pos.block as usize);
        let n = match self.sectors.get(s) {
            Some(blocks) if b < blocks.len() => blocks.len(),
            _ => return Err(WriteFault::OutOfRange),
        };
        let trailer = self.sectors[s][n - 1];

        // Authenticate against the current trailer
        let expected = match key_type {
            KeyType::A => key_at(&trailer, KEY_A),
            KeyType::B => key_at(&trailer, KEY_B),
        };
        if expected != *key {
            return Err(WriteFault::AuthFailed);
        }

        let ac = AccessConditions::decode(&trailer[6..9]).ok_or(WriteFault::Rejected)?;

        // Data block
        if b != n - 1 {
            if pos == Position::new(0, 0) && !self.magic {
                return Err(WriteFault::Rejected);
            }
            if !ac.data_write(block_group(n, b)).allows(key_type) {
                return Err(WriteFault::Rejected);
            }

            self.sectors[s][b] = *data;
            return Ok(());
        }

        // Sector trailer, keys and access bits are permitted separately
        let (keys, access) = ac.trailer_write();
        let (write_keys, write_access) = (keys.allows(key_type), access.allows(key_type));
        if !write_keys && !write_access {
            return Err(WriteFault::Rejected);
        }

        // Refuse access bits that would lock the sector
        if write_access && AccessConditions::decode(&data[6..9]).is_none() {
            return Err(WriteFault::Rejected);
        }

        let t = &mut self.sectors[s][n - 1];
        if write_keys {
            t[KEY_A].copy_from_slice(&data[KEY_A]);
            t[KEY_B].copy_from_slice(&data[KEY_B]);
        }
        if write_access {
            t[ACCESS].copy_from_slice(&data[ACCESS]);
        }

        Ok(())
    }
}

fn key_at(b: &Block, r: std::ops::Range<usize>) -> Key {
    let mut k = [0u8; 6];
    k.copy_from_slice(&b[r]);
    Key::new(k)
}

impl TagSession for SimTag {
    fn sector_count(&self) -> usize {
        self.layout.sector_count()
    }

    fn classify(
        &mut self,
        positions: &[Position],
        keys: &KeyMap,
    ) -> Result<Classification, mct_core::Error> {
        if !self.connected {
            return Err(mct_core::Error::TagLost);
        }

        Ok(positions
            .iter()
            .map(|p| (*p, self.classify_one(*p, keys)))
            .collect())
    }

    fn write_block(
        &mut self,
        pos: Position,
        data: &Block,
        key: &Key,
        key_type: KeyType,
    ) -> Result<(), WriteFault> {
        let result = self.try_write(pos, data, key, key_type);

        debug!("Write {} with key {}: {:?}", pos, key_type, result);

        self.journal.push(WriteRecord {
            position: pos,
            key_type,
            result,
        });

        result
    }

    fn close(&mut self) {
        self.connected = false;
    }
}
