// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::path::Path;

use async_trait::async_trait;
use log::debug;

use mct_core::session::TagSession;
use mct_sim::{Layout, SimTag};

use crate::{read_dump, Error};

/// Connect trait for tag providers, resolves once a tag is
/// presented and returns a session for it
#[async_trait]
pub trait Connect {
    type Session: TagSession + Send + 'static;

    /// Connect to the presented tag
    async fn connect(&self) -> Result<Self::Session, Error>;
}

/// Provider presenting a simulated tag
#[derive(Clone, Debug, Default)]
pub struct SimProvider {
    tag: Option<SimTag>,
}

impl SimProvider {
    /// Create a provider presenting the supplied tag
    pub fn new(tag: SimTag) -> Self {
        Self { tag: Some(tag) }
    }

    /// Create a provider presenting a blank tag
    pub fn blank(layout: Layout) -> Self {
        Self::new(SimTag::new(layout))
    }

    /// Create a provider presenting a tag loaded from a dump image
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let d = read_dump(path).await?;
        let tag = SimTag::from_dump(&d)?;

        debug!("Loaded {} tag image", tag.layout());

        Ok(Self::new(tag))
    }

    /// Set whether the manufacturer block is writable
    pub fn with_magic(mut self, magic: bool) -> Self {
        self.tag = self.tag.map(|t| t.with_magic(magic));
        self
    }
}

#[async_trait]
impl Connect for SimProvider {
    type Session = SimTag;

    async fn connect(&self) -> Result<SimTag, Error> {
        match &self.tag {
            Some(t) => {
                debug!("Tag detected ({}, {} sectors)", t.layout(), t.sector_count());
                Ok(t.clone())
            }
            None => Err(Error::NoTag),
        }
    }
}
