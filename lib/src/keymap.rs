// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Key map files, mapping sectors to known keys
//!
//! ```toml
//! [sectors.0]
//! a = "FFFFFFFFFFFF"
//! b = "FFFFFFFFFFFF"
//! ```

use std::{collections::BTreeMap, path::Path};

use log::debug;
use serde::{Deserialize, Serialize};

use mct_core::{Key, KeyMap, SectorKeys};

use crate::Error;

/// Serialisable key map
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct KeyMapFile {
    /// Keys by sector index
    #[serde(default)]
    pub sectors: BTreeMap<String, SectorEntry>,
}

/// Keys for a single sector
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct SectorEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub a: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b: Option<String>,
}

impl KeyMapFile {
    /// Convert to a [KeyMap], checking sector indices and keys
    pub fn to_key_map(&self) -> Result<KeyMap, Error> {
        let mut m = KeyMap::new();

        for (s, e) in &self.sectors {
            let sector: u8 = s
                .parse()
                .map_err(|_| Error::KeyMap(format!("invalid sector index {s:?}")))?;

            let parse_key = |k: &Option<String>| -> Result<Option<Key>, Error> {
                k.as_deref()
                    .map(|v| {
                        v.parse()
                            .map_err(|_| Error::KeyMap(format!("invalid key {v:?} (sector {s})")))
                    })
                    .transpose()
            };

            m.insert(sector, SectorKeys::new(parse_key(&e.a)?, parse_key(&e.b)?));
        }

        Ok(m)
    }
}

impl From<&KeyMap> for KeyMapFile {
    fn from(m: &KeyMap) -> Self {
        let sectors = m
            .iter()
            .map(|(s, k)| {
                let e = SectorEntry {
                    a: k.a.map(|k| k.to_string()),
                    b: k.b.map(|k| k.to_string()),
                };
                (s.to_string(), e)
            })
            .collect();

        Self { sectors }
    }
}

/// Load a key map file
pub async fn load_key_map(path: impl AsRef<Path>) -> Result<KeyMap, Error> {
    let s = tokio::fs::read_to_string(path.as_ref()).await?;
    let f: KeyMapFile = toml::from_str(&s)?;

    let m = f.to_key_map()?;

    debug!(
        "Loaded key map {} ({} sectors)",
        path.as_ref().display(),
        m.len()
    );

    Ok(m)
}

/// Save a key map file
pub async fn save_key_map(path: impl AsRef<Path>, m: &KeyMap) -> Result<(), Error> {
    let s = toml::to_string(&KeyMapFile::from(m))?;
    tokio::fs::write(path.as_ref(), s).await?;
    Ok(())
}
