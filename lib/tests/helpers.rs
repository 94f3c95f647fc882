#![allow(unused)]

use std::{path::PathBuf, str::FromStr};

use log::LevelFilter;
use simplelog::SimpleLogger;
use tokio::sync::oneshot;

use mct_clone::{Dump, Key};
use mct_core::{
    engine::Classification,
    session::{TagSession, WriteFault},
    Block, KeyMap, KeyType, Position,
};
use mct_sim::{Layout, SimTag};

pub const KEY_A: Key = Key([0xa0, 0xa1, 0xa2, 0xa3, 0xa4, 0xa5]);
pub const KEY_B: Key = Key([0xb0, 0xb1, 0xb2, 0xb3, 0xb4, 0xb5]);

/// Setup logging for tests, level from `LOG_LEVEL`
pub fn init_logging() {
    let log_level = match std::env::var("LOG_LEVEL").map(|v| LevelFilter::from_str(&v)) {
        Ok(Ok(l)) => l,
        _ => LevelFilter::Debug,
    };

    let _ = SimpleLogger::init(log_level, simplelog::Config::default());
}

/// 1K dump image with sector 1 re-keyed and holding data
pub fn dump_lines() -> Vec<String> {
    let mut lines = SimTag::new(Layout::Classic1k).to_dump_lines();

    lines[6] = "11111111111111111111111111111111".to_string();
    lines[9] = "A0A1A2A3A4A57F078869B0B1B2B3B4B5".to_string();
    lines[11] = "22222222222222222222222222222222".to_string();

    lines
}

pub fn dump() -> Dump {
    let lines = dump_lines();
    Dump::parse(lines.iter().map(|l| l.as_str())).unwrap()
}

/// Unique path under the system temporary directory
pub fn temp_path(name: &str) -> PathBuf {
    let id: u64 = rand::random();
    std::env::temp_dir().join(format!("mct-clone-{id:016x}-{name}"))
}

/// Simulated tag that parks after its first successful write until released
pub struct GatedTag {
    pub tag: SimTag,
    gate: Option<(oneshot::Sender<()>, oneshot::Receiver<()>)>,
}

impl GatedTag {
    /// Returns the tag with channels to await the parked write and to release it
    pub fn new(tag: SimTag) -> (Self, oneshot::Receiver<()>, oneshot::Sender<()>) {
        let (parked_tx, parked_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();

        let t = Self {
            tag,
            gate: Some((parked_tx, release_rx)),
        };

        (t, parked_rx, release_tx)
    }
}

impl TagSession for GatedTag {
    fn sector_count(&self) -> usize {
        self.tag.sector_count()
    }

    fn classify(
        &mut self,
        positions: &[Position],
        keys: &KeyMap,
    ) -> Result<Classification, mct_core::Error> {
        self.tag.classify(positions, keys)
    }

    fn write_block(
        &mut self,
        pos: Position,
        data: &Block,
        key: &Key,
        key_type: KeyType,
    ) -> Result<(), WriteFault> {
        self.tag.write_block(pos, data, key, key_type)?;

        if let Some((parked, release)) = self.gate.take() {
            let _ = parked.send(());
            let _ = release.blocking_recv();
        }

        Ok(())
    }

    fn close(&mut self) {
        self.tag.close()
    }
}
