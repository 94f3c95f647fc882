// Copyright (c) 2022-2023 The MobileCoin Foundation

use serde::{Deserialize, Serialize};
use strum::Display;

use mct_core::{clone::CloneOutcome, writer::Progress};

use crate::Error;

/// Clone status for reporting
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CloneStatus {
    Written,
    NothingToWrite,
    Failed,
}

/// Serialisable summary of a clone attempt
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct CloneSummary {
    pub status: CloneStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped: Option<usize>,

    /// Blocks committed to the tag
    pub written: usize,

    /// Position of the aborted write (`sector:block`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CloneSummary {
    /// Build a summary from a clone result and the last reported progress
    pub fn new(r: &Result<CloneOutcome, Error>, last: Option<&Progress>) -> Self {
        match r {
            Ok(CloneOutcome::Written(r)) => Self {
                status: CloneStatus::Written,
                requested: Some(r.requested),
                planned: Some(r.planned),
                skipped: Some(r.skipped),
                written: r.written,
                failed_at: None,
                error: None,
            },
            Ok(CloneOutcome::NothingToWrite { requested }) => Self {
                status: CloneStatus::NothingToWrite,
                requested: Some(*requested),
                planned: Some(0),
                skipped: Some(*requested),
                written: 0,
                failed_at: None,
                error: None,
            },
            Err(e) => Self {
                status: CloneStatus::Failed,
                requested: None,
                planned: last.map(|p| p.total),
                skipped: None,
                written: last.map_or(0, |p| p.written),
                failed_at: e
                    .engine()
                    .and_then(|e| e.failed_position())
                    .map(|p| p.to_string()),
                error: Some(e.to_string()),
            },
        }
    }

    /// Blocks may have been written before the clone failed
    pub fn is_partial(&self) -> bool {
        self.status == CloneStatus::Failed && self.written > 0
    }
}
