// Copyright (c) 2022-2023 The MobileCoin Foundation

//! MIFARE Classic clone library (and CLI)
//!
//! This wraps the [mct_core] clone engine with the host-side pieces
//! needed to drive it: key file and key map loading, fast-clone profiles,
//! tag providers and a background [WriteJob] reporting progress.

pub use mct_core::{Dump, Key, KeyMap, KeyType, Position, SectorKeys};

mod error;
pub use error::Error;

pub mod keyfile;

pub mod keymap;

pub mod profile;

mod provider;
pub use provider::{Connect, SimProvider};

mod job;
pub use job::{Canceller, SharedSession, WriteJob};

mod summary;
pub use summary::{CloneStatus, CloneSummary};

/// Read and parse a dump file
pub async fn read_dump(path: impl AsRef<std::path::Path>) -> Result<Dump, Error> {
    let s = tokio::fs::read_to_string(path.as_ref()).await?;
    let d = Dump::parse(s.lines())?;

    log::debug!(
        "Loaded dump {} ({} sectors, {} keys)",
        path.as_ref().display(),
        d.len(),
        d.extracted_keys().len()
    );

    Ok(d)
}
