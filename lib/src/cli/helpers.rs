// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Serialize;

use mct_clone::{
    keyfile::read_key_files, keymap::load_key_map, Dump, Key, KeyMap, SimProvider,
};
use mct_sim::{Layout, SimTag};

/// Simulated tag options
#[derive(Clone, PartialEq, Debug, clap::Args)]
pub struct TagArgs {
    /// Tag image (dump format) loaded into the simulator, blank when omitted
    #[clap(long)]
    pub tag: Option<PathBuf>,

    /// Layout for blank tags
    #[clap(long, default_value = "1k")]
    pub layout: Layout,

    /// Allow writes to the manufacturer block (gen1 magic tag)
    #[clap(long)]
    pub magic: bool,
}

impl TagArgs {
    /// Build a provider presenting the configured tag
    pub async fn provider(&self) -> anyhow::Result<SimProvider> {
        let p = match &self.tag {
            Some(t) => SimProvider::load(t).await?,
            None => SimProvider::blank(self.layout),
        };

        Ok(p.with_magic(self.magic))
    }
}

/// Key sources for mapping tag keys
#[derive(Clone, PartialEq, Debug, Default, clap::Args)]
pub struct KeyArgs {
    /// Key files (MCT `.keys` format), keys are tried against each sector
    #[clap(long = "key-file")]
    pub key_files: Vec<PathBuf>,

    /// Key map (TOML), used in place of key discovery
    #[clap(long, conflicts_with = "key_files")]
    pub key_map: Option<PathBuf>,
}

/// Collect candidate keys from the dump and key files
pub async fn candidate_keys(
    dump: Option<&Dump>,
    key_files: &[PathBuf],
) -> anyhow::Result<Vec<Key>> {
    let mut keys: Vec<Key> = dump
        .map(|d| d.extracted_keys().iter().copied().collect())
        .unwrap_or_default();

    for k in read_key_files(key_files).await? {
        if !keys.contains(&k) {
            keys.push(k);
        }
    }

    debug!("Using {} candidate keys", keys.len());

    Ok(keys)
}

/// Resolve the key map for a tag, loading a key map file where provided
/// or discovering keys from the dump and key files
pub async fn resolve_keys(dump: &Dump, tag: &SimTag, args: &KeyArgs) -> anyhow::Result<KeyMap> {
    if let Some(p) = &args.key_map {
        return Ok(load_key_map(p).await?);
    }

    let candidates = candidate_keys(Some(dump), &args.key_files).await?;
    let m = tag.map_keys(&candidates);

    info!("Mapped keys for {} sectors", m.len());

    Ok(m)
}

/// Helper to write output files, format determined by extension
pub async fn write_output(p: &Path, value: &impl Serialize) -> anyhow::Result<()> {
    debug!("Writing output to '{}'", p.display());

    let s = match p.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::to_string_pretty(value)?,
        Some("toml") => toml::to_string(value)?,
        _ => return Err(anyhow::anyhow!("unsupported output file format")),
    };

    tokio::fs::write(p, s).await?;

    Ok(())
}

/// Write a tag image in dump format
pub async fn write_image(p: &Path, lines: &[String]) -> anyhow::Result<()> {
    debug!("Writing tag image to '{}'", p.display());

    let mut s = lines.join("\n");
    s.push('\n');
    tokio::fs::write(p, s).await?;

    Ok(())
}
