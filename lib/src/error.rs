// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::path::PathBuf;

/// MIFARE Classic clone API Error Type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Clone engine error
    #[error(transparent)]
    Engine(#[from] mct_core::Error),

    /// Simulated tag error
    #[error("Simulator error: {0}")]
    Sim(#[from] mct_sim::Error),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid key in a key file
    #[error("Invalid key {value:?} (line {line})")]
    InvalidKey { line: usize, value: String },

    /// Key file parsing failed
    #[error("Key file {}: {source}", .path.display())]
    KeyFile {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    /// Invalid key map entry
    #[error("Invalid key map entry: {0}")]
    KeyMap(String),

    /// TOML decode error
    #[error("TOML decode error: {0}")]
    TomlDecode(#[from] toml::de::Error),

    /// TOML encode error
    #[error("TOML encode error: {0}")]
    TomlEncode(#[from] toml::ser::Error),

    /// Profile slot out of range
    #[error("Invalid profile slot {0} (expected 1..={max})", max = crate::profile::PROFILE_SLOTS)]
    InvalidSlot(usize),

    /// Profile slot empty
    #[error("Profile slot {0} not configured")]
    NotConfigured(usize),

    /// No tag available to connect
    #[error("No tag detected")]
    NoTag,

    /// Background worker failed
    #[error("Write worker failed: {0}")]
    Worker(String),
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Error::Worker(e.to_string())
    }
}

impl Error {
    /// Fetch the underlying engine error, if any
    pub fn engine(&self) -> Option<&mct_core::Error> {
        match self {
            Error::Engine(e) => Some(e),
            _ => None,
        }
    }
}
