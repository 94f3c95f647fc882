// Copyright (c) 2022-2023 The MobileCoin Foundation

//! MCT key files (`.keys`)
//!
//! One key per line as 12 hex characters, lines starting with `#` are
//! comments and blank lines are ignored.

use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use log::debug;

use mct_core::Key;

use crate::Error;

/// Comment prefix for key files
pub const COMMENT: char = '#';

/// Parse key file content, keeping the first occurrence of each key
pub fn parse_keys(s: &str) -> Result<Vec<Key>, Error> {
    let mut keys = vec![];
    let mut seen = BTreeSet::new();

    for (i, line) in s.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(COMMENT) {
            continue;
        }

        let k: Key = line.parse().map_err(|_| Error::InvalidKey {
            line: i + 1,
            value: line.to_string(),
        })?;

        if seen.insert(k) {
            keys.push(k);
        }
    }

    Ok(keys)
}

/// Format keys for writing to a key file, one per line in ascending order
pub fn format_keys<'a>(keys: impl IntoIterator<Item = &'a Key>) -> String {
    let keys: BTreeSet<&Key> = keys.into_iter().collect();

    let mut s = String::new();
    for k in keys {
        s.push_str(&k.to_string());
        s.push('\n');
    }
    s
}

/// Read a single key file
pub async fn read_key_file(path: impl AsRef<Path>) -> Result<Vec<Key>, Error> {
    let path = path.as_ref();

    let s = tokio::fs::read_to_string(path).await?;
    let keys = parse_keys(&s).map_err(|e| Error::KeyFile {
        path: path.to_owned(),
        source: Box::new(e),
    })?;

    debug!("Loaded {} keys from {}", keys.len(), path.display());

    Ok(keys)
}

/// Read and merge key files, keys are de-duplicated in file order
pub async fn read_key_files(paths: &[PathBuf]) -> Result<Vec<Key>, Error> {
    let mut keys = vec![];
    let mut seen = BTreeSet::new();

    for p in paths {
        for k in read_key_file(p).await? {
            if seen.insert(k) {
                keys.push(k);
            }
        }
    }

    Ok(keys)
}

/// Write keys to a key file
pub async fn write_key_file<'a>(
    path: impl AsRef<Path>,
    keys: impl IntoIterator<Item = &'a Key>,
) -> Result<(), Error> {
    tokio::fs::write(path.as_ref(), format_keys(keys)).await?;
    Ok(())
}
