// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Command line utility for cloning MIFARE Classic dumps onto tags

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::Parser;
use log::{debug, error, info, warn, LevelFilter};

use mct_clone::{
    keyfile::write_key_file,
    keymap::save_key_map,
    profile::{Config, Profile},
    read_dump, CloneSummary, Connect, WriteJob,
};
use mct_core::{
    clone::{prepare, CloneOutcome},
    writer::Progress,
};

mod helpers;
use helpers::*;

/// MIFARE Classic clone utility
#[derive(Clone, PartialEq, Debug, Parser)]
struct Options {
    /// Profile configuration file
    #[clap(long, default_value = "mct-clone.toml")]
    config: PathBuf,

    /// Subcommand to execute
    #[clap(subcommand)]
    cmd: Actions,

    /// Enable verbose logging
    #[clap(long, default_value = "info")]
    log_level: LevelFilter,
}

#[derive(Clone, PartialEq, Debug, Parser)]
#[non_exhaustive]
enum Actions {
    /// List keys found in dump sector trailers
    Keys {
        /// Dump file
        dump: PathBuf,

        /// Write keys to a key file
        #[clap(long)]
        output: Option<PathBuf>,
    },

    /// Discover tag keys and write a key map
    MapKeys {
        #[clap(flatten)]
        tag: TagArgs,

        /// Key files to try against each sector
        #[clap(long = "key-file")]
        key_files: Vec<PathBuf>,

        /// Dump to source additional keys from
        #[clap(long)]
        dump: Option<PathBuf>,

        /// Key map output file (TOML)
        #[clap(long)]
        output: PathBuf,
    },

    /// Show the blocks that would be written, without writing
    Plan {
        /// Dump file
        dump: PathBuf,

        #[clap(flatten)]
        tag: TagArgs,

        #[clap(flatten)]
        keys: KeyArgs,
    },

    /// Write a dump to the tag
    Clone {
        /// Dump file
        dump: PathBuf,

        #[clap(flatten)]
        tag: TagArgs,

        #[clap(flatten)]
        keys: KeyArgs,

        #[clap(flatten)]
        output: OutputArgs,
    },

    /// Manage and run fast-clone profiles
    Profile {
        #[clap(subcommand)]
        cmd: ProfileActions,
    },
}

#[derive(Clone, PartialEq, Debug, Parser)]
enum ProfileActions {
    /// List profile slots
    List,

    /// Configure a profile slot
    Set {
        /// Slot index (1..=4)
        slot: usize,

        /// Dump file
        dump: PathBuf,

        /// Display name
        #[clap(long)]
        name: Option<String>,

        /// Key files
        #[clap(long = "key-file")]
        key_files: Vec<PathBuf>,
    },

    /// Clear a profile slot
    Clear {
        /// Slot index (1..=4)
        slot: usize,
    },

    /// Clone using a profile
    Run {
        /// Slot index (1..=4)
        slot: usize,

        #[clap(flatten)]
        tag: TagArgs,

        #[clap(flatten)]
        output: OutputArgs,
    },
}

#[derive(Clone, PartialEq, Debug, clap::Args)]
struct OutputArgs {
    /// Write a clone report (`.json` or `.toml`)
    #[clap(long)]
    report: Option<PathBuf>,

    /// Save the resulting tag image
    #[clap(long)]
    save_tag: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Options::parse();

    // Setup logging
    simplelog::SimpleLogger::init(args.log_level, simplelog::Config::default())?;

    debug!("Executing command: {:?}", args.cmd);

    match args.cmd {
        Actions::Keys { dump, output } => {
            let d = read_dump(&dump).await?;

            info!("{} keys:", d.extracted_keys().len());
            for k in d.extracted_keys() {
                info!("  {}", k);
            }

            if let Some(o) = output {
                write_key_file(&o, d.extracted_keys()).await?;
                info!("Keys written to '{}'", o.display());
            }
        }
        Actions::MapKeys {
            tag,
            key_files,
            dump,
            output,
        } => {
            let d = match &dump {
                Some(p) => Some(read_dump(p).await?),
                None => None,
            };
            let candidates = candidate_keys(d.as_ref(), &key_files).await?;

            let t = tag.provider().await?.connect().await?;
            let m = t.map_keys(&candidates);

            for (s, k) in m.iter() {
                info!("sector {:2}: A {:?} B {:?}", s, k.a, k.b);
            }

            save_key_map(&output, &m).await?;
            info!("Key map for {} sectors written to '{}'", m.len(), output.display());
        }
        Actions::Plan { dump, tag, keys } => {
            let d = read_dump(&dump).await?;
            let mut t = tag.provider().await?.connect().await?;
            let m = resolve_keys(&d, &t, &keys).await?;

            let plan = prepare(&d, &m, &mut t)?;

            for (p, w) in plan.iter() {
                info!("{:>5}: key {} ({})", p, w.key_type, w.key);
            }
            info!(
                "{} of {} blocks writable ({} skipped)",
                plan.len(),
                plan.requested(),
                plan.skipped()
            );
        }
        Actions::Clone {
            dump,
            tag,
            keys,
            output,
        } => {
            clone(dump, &tag, &keys, &output).await?;
        }
        Actions::Profile { cmd } => profile(&args.config, cmd).await?,
    }

    Ok(())
}

/// Execute profile commands
async fn profile(config: &Path, cmd: ProfileActions) -> anyhow::Result<()> {
    let mut c = Config::load(config).await?;

    match cmd {
        ProfileActions::List => {
            for (s, p) in c.slots() {
                match p {
                    Some(p) => info!(
                        "{}: {} ({}, {} key files)",
                        s,
                        p.label(),
                        p.dump.display(),
                        p.key_files.len()
                    ),
                    None => info!("{}: {} (empty)", s, c.label(s)),
                }
            }
        }
        ProfileActions::Set {
            slot,
            dump,
            name,
            key_files,
        } => {
            // Check the dump is readable before saving
            read_dump(&dump).await?;

            c.set(Profile {
                slot,
                name,
                dump,
                key_files,
            })?;
            c.save(config).await?;

            info!("Saved profile {}: {}", slot, c.label(slot));
        }
        ProfileActions::Clear { slot } => match c.clear(slot)? {
            Some(p) => {
                c.save(config).await?;
                info!("Cleared profile {}: {}", slot, p.label());
            }
            None => warn!("Profile {} not configured", slot),
        },
        ProfileActions::Run { slot, tag, output } => {
            let p = c.profile(slot)?;
            info!("Running {}", p.label());

            let keys = KeyArgs {
                key_files: p.key_files.clone(),
                key_map: None,
            };

            clone(p.dump.clone(), &tag, &keys, &output).await?;
        }
    }

    Ok(())
}

/// Clone a dump onto the tag, reporting progress
async fn clone(
    dump: PathBuf,
    tag: &TagArgs,
    keys: &KeyArgs,
    output: &OutputArgs,
) -> anyhow::Result<()> {
    let d = Arc::new(read_dump(&dump).await?);

    info!("Waiting for tag");
    let t = tag.provider().await?.connect().await?;

    let m = resolve_keys(&d, &t, keys).await?;

    // Start write on a background worker
    let mut job = WriteJob::spawn(t, d, m);
    let canceller = job.canceller();

    let mut last: Option<Progress> = None;
    loop {
        tokio::select! {
            p = job.progress() => match p {
                Some(p) => {
                    info!("Writing: {}/{} ({})", p.written, p.total, p.position);
                    last = Some(p);
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted");
                canceller.cancel();
            }
        }
    }

    let session = job.session();
    let r = job.wait().await;
    let summary = CloneSummary::new(&r, last.as_ref());

    match &r {
        Ok(CloneOutcome::Written(s)) => info!(
            "Clone complete, {} blocks written ({} skipped)",
            s.written, s.skipped
        ),
        Ok(CloneOutcome::NothingToWrite { requested }) => warn!(
            "Nothing to write, none of {} blocks writable with the available keys",
            requested
        ),
        Err(e) => {
            error!("Clone failed: {}", e);
            if summary.is_partial() {
                warn!("Partially written, tag may be in an inconsistent state");
            }
        }
    }

    if let Some(p) = &output.save_tag {
        match session.with(|t| t.to_dump_lines()) {
            Some(lines) => write_image(p, &lines).await?,
            None => warn!("Tag image unavailable, not saved"),
        }
    }

    if let Some(p) = &output.report {
        write_output(p, &summary).await?;
    }

    r?;

    Ok(())
}
