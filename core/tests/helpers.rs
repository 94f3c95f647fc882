#![allow(unused)]

use std::collections::BTreeMap;

use log::debug;

use mct_core::{
    dump::BLOCK_LEN,
    engine::{Classification, WriteAccess},
    session::{TagSession, WriteFault},
    Block, Dump, Key, KeyMap, KeyType, Position,
};

pub const KEY_A: Key = Key([0xa0, 0xa1, 0xa2, 0xa3, 0xa4, 0xa5]);
pub const KEY_B: Key = Key([0xb0, 0xb1, 0xb2, 0xb3, 0xb4, 0xb5]);

/// Setup logging for tests
pub fn init_logging() {
    let _ = simplelog::SimpleLogger::init(log::LevelFilter::Debug, Default::default());
}

/// Session double recording every write attempt.
///
/// Speaks the raw reader codes (classification `-1..=6`, write status
/// `0` / fault code), decoded through [Classification::from_codes] and
/// [WriteFault::check].
pub struct RecordingSession {
    pub sectors: usize,
    /// Classification codes per position, unlisted positions report `-1`
    pub codes: BTreeMap<Position, i8>,
    /// Remaining failures and status code per position
    pub failures: BTreeMap<Position, (usize, i8)>,
    pub writes: Vec<(Position, Block, Key, KeyType)>,
    pub classify_calls: usize,
    pub closed: bool,
}

/// Write status code reported for a rejected write
pub const REJECTED: i8 = 3;

impl RecordingSession {
    pub fn new(sectors: usize) -> Self {
        Self {
            sectors,
            codes: BTreeMap::new(),
            failures: BTreeMap::new(),
            writes: vec![],
            classify_calls: 0,
            closed: false,
        }
    }

    /// Classify every known dump position with the provided access
    pub fn classify_all(mut self, dump: &Dump, access: WriteAccess) -> Self {
        for p in dump.known_positions() {
            self.codes.insert(p, i8::from(access));
        }
        self
    }

    /// Report a raw classification code for `pos`
    pub fn with_code(mut self, pos: Position, code: i8) -> Self {
        self.codes.insert(pos, code);
        self
    }

    /// Fail the next `n` writes to `pos` as rejected
    pub fn fail(self, pos: Position, n: usize) -> Self {
        self.fail_with(pos, n, REJECTED)
    }

    /// Fail the next `n` writes to `pos` with a raw status code
    pub fn fail_with(mut self, pos: Position, n: usize, code: i8) -> Self {
        self.failures.insert(pos, (n, code));
        self
    }

    /// Decoded classification for all configured positions
    pub fn classification(&self) -> Classification {
        Classification::from_codes(self.codes.iter().map(|(p, c)| (*p, *c)))
    }

    /// Positions of write attempts in order
    pub fn written(&self) -> Vec<(u8, u8)> {
        self.writes
            .iter()
            .map(|(p, ..)| (p.sector, p.block))
            .collect()
    }

    fn status(&mut self, pos: Position) -> i8 {
        if self.closed {
            return -1;
        }

        match self.failures.get_mut(&pos) {
            Some((n, code)) if *n > 0 => {
                *n -= 1;
                *code
            }
            _ => 0,
        }
    }
}

impl TagSession for RecordingSession {
    fn sector_count(&self) -> usize {
        self.sectors
    }

    fn classify(
        &mut self,
        positions: &[Position],
        _keys: &KeyMap,
    ) -> Result<Classification, mct_core::Error> {
        self.classify_calls += 1;

        if self.closed {
            return Err(mct_core::Error::TagLost);
        }

        let codes = positions
            .iter()
            .map(|p| (*p, self.codes.get(p).copied().unwrap_or(-1)));

        Ok(Classification::from_codes(codes))
    }

    fn write_block(
        &mut self,
        pos: Position,
        data: &Block,
        key: &Key,
        key_type: KeyType,
    ) -> Result<(), WriteFault> {
        debug!("write {} with {} ({})", pos, key, key_type);

        self.writes.push((pos, *data, *key, key_type));

        let code = self.status(pos);
        WriteFault::check(code)
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// Build a dump with the provided blocks per sector, each block
/// filled with `(sector << 4) | block`
pub fn dump_with(sectors: &[(u8, usize)]) -> Dump {
    let mut lines = vec![];
    for &(s, n) in sectors {
        lines.push(format!("+Sector: {s}"));
        for b in 0..n {
            let v = (s << 4) | b as u8;
            lines.push(hex_block(&[v; BLOCK_LEN]));
        }
    }

    Dump::parse(lines.iter().map(|l| l.as_str())).unwrap()
}

pub fn hex_block(b: &Block) -> String {
    b.iter().map(|v| format!("{v:02X}")).collect()
}
