// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Fast-clone profiles
//!
//! Up to [PROFILE_SLOTS] saved dump and key file combinations, stored in a
//! TOML configuration file:
//!
//! ```toml
//! [[profiles]]
//! slot = 1
//! name = "Office"
//! dump = "office.mct"
//! key_files = ["std.keys"]
//! ```

use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Number of profile slots
pub const PROFILE_SLOTS: usize = 4;

/// Saved clone profile
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Profile {
    /// Slot index (1..=[PROFILE_SLOTS])
    pub slot: usize,

    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Dump to be written
    pub dump: PathBuf,

    /// Key files used to map tag keys
    #[serde(default)]
    pub key_files: Vec<PathBuf>,
}

impl Profile {
    /// Display label, defaulting to `Fast Clone N`
    pub fn label(&self) -> String {
        match &self.name {
            Some(n) if !n.is_empty() => n.clone(),
            _ => default_label(self.slot),
        }
    }
}

/// Default label for a profile slot
pub fn default_label(slot: usize) -> String {
    format!("Fast Clone {slot}")
}

/// Profile configuration
#[derive(Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    profiles: Vec<Profile>,
}

fn check_slot(slot: usize) -> Result<(), Error> {
    match (1..=PROFILE_SLOTS).contains(&slot) {
        true => Ok(()),
        false => Err(Error::InvalidSlot(slot)),
    }
}

impl Config {
    /// Load configuration, returning an empty configuration where the
    /// file does not exist
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();

        let s = match tokio::fs::read_to_string(path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let mut c: Config = toml::from_str(&s)?;
        for p in &c.profiles {
            check_slot(p.slot)?;
        }

        // Later entries replace earlier ones for the same slot
        c.profiles.reverse();
        let mut profiles: Vec<Profile> = vec![];
        for p in c.profiles {
            if !profiles.iter().any(|q| q.slot == p.slot) {
                profiles.push(p);
            }
        }
        profiles.sort_by_key(|p| p.slot);

        Ok(Self { profiles })
    }

    /// Save configuration, creating parent directories as required
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();

        if let Some(d) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(d).await?;
        }

        let s = toml::to_string(self)?;
        tokio::fs::write(path, s).await?;

        debug!("Saved config to {}", path.display());

        Ok(())
    }

    /// Fetch the profile for a slot
    pub fn get(&self, slot: usize) -> Result<Option<&Profile>, Error> {
        check_slot(slot)?;
        Ok(self.profiles.iter().find(|p| p.slot == slot))
    }

    /// Fetch a configured profile, erroring on empty slots
    pub fn profile(&self, slot: usize) -> Result<&Profile, Error> {
        self.get(slot)?.ok_or(Error::NotConfigured(slot))
    }

    /// Store a profile, replacing any existing profile in the slot
    pub fn set(&mut self, profile: Profile) -> Result<(), Error> {
        check_slot(profile.slot)?;

        self.profiles.retain(|p| p.slot != profile.slot);
        self.profiles.push(profile);
        self.profiles.sort_by_key(|p| p.slot);

        Ok(())
    }

    /// Clear a slot, returning the removed profile
    pub fn clear(&mut self, slot: usize) -> Result<Option<Profile>, Error> {
        check_slot(slot)?;

        let i = self.profiles.iter().position(|p| p.slot == slot);
        Ok(i.map(|i| self.profiles.remove(i)))
    }

    /// Iterate over all slots with their profiles (if configured)
    pub fn slots(&self) -> impl Iterator<Item = (usize, Option<&Profile>)> + '_ {
        (1..=PROFILE_SLOTS).map(|s| (s, self.profiles.iter().find(|p| p.slot == s)))
    }

    /// Display label for a slot
    pub fn label(&self, slot: usize) -> String {
        match self.profiles.iter().find(|p| p.slot == slot) {
            Some(p) => p.label(),
            None => default_label(slot),
        }
    }
}
