// Copyright (c) 2022-2023 The MobileCoin Foundation

use alloc::collections::BTreeMap;

use crate::{
    dump::Position,
    keys::{Key, KeyType},
};

/// Key and key role resolved for a single block write
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct PlannedWrite {
    pub key: Key,
    pub key_type: KeyType,
}

/// Resolved set of writable positions.
///
/// Built by [resolve][super::resolve] immediately before writing,
/// consumed once by the [writer][crate::writer].
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct WritePlan {
    sectors: BTreeMap<u8, BTreeMap<u8, PlannedWrite>>,
    requested: usize,
}

impl WritePlan {
    pub(crate) fn with_requested(requested: usize) -> Self {
        Self {
            sectors: BTreeMap::new(),
            requested,
        }
    }

    pub(crate) fn insert(&mut self, pos: Position, w: PlannedWrite) {
        self.sectors
            .entry(pos.sector)
            .or_default()
            .insert(pos.block, w);
    }

    /// Fetch the planned write for a position
    pub fn get(&self, pos: Position) -> Option<&PlannedWrite> {
        self.sectors.get(&pos.sector).and_then(|b| b.get(&pos.block))
    }

    /// Planned writes in execution order (ascending sector, then block)
    pub fn iter(&self) -> impl Iterator<Item = (Position, &PlannedWrite)> + '_ {
        self.sectors.iter().flat_map(|(s, blocks)| {
            blocks
                .iter()
                .map(move |(b, w)| (Position::new(*s, *b), w))
        })
    }

    /// Sectors with at least one planned write, ascending
    pub fn sectors(&self) -> impl Iterator<Item = u8> + '_ {
        self.sectors.keys().copied()
    }

    /// Number of planned writes
    pub fn len(&self) -> usize {
        self.sectors.values().map(|b| b.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }

    /// Number of distinct positions requested when building the plan
    pub fn requested(&self) -> usize {
        self.requested
    }

    /// Number of requested positions excluded from the plan
    pub fn skipped(&self) -> usize {
        self.requested - self.len()
    }
}
