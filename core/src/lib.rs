// Copyright (c) 2022-2023 The MobileCoin Foundation

//! MIFARE Classic clone engine
//!
//! This decides, for a previously captured [Dump][dump::Dump] and a live tag
//! [session][session::TagSession], which blocks can be rewritten, with which
//! key, and in what order, then executes the writes.
//!
//! ## Operations
//!
//! ### Loading a dump
//!
//! [`Dump::parse`][dump::Dump::parse] reads the textual dump format
//! (`+Sector: N` headers followed by 32 hex character block lines, with `-`
//! marking unknown bytes) and harvests the keys embedded in each sector
//! trailer, see [`Dump::extracted_keys`][dump::Dump::extracted_keys].
//!
//! ### Planning writes
//!
//! The tag classifies each requested position into a
//! [`WriteAccess`][engine::WriteAccess]. [`resolve`][engine::resolve] combines
//! this with a [`KeyMap`][keys::KeyMap] to build a [`WritePlan`][engine::WritePlan],
//! silently dropping positions that cannot be written with the keys at hand.
//!
//! ### Executing writes
//!
//! [`execute`][writer::execute] walks the plan in ascending sector / block
//! order, retrying each block once, and aborts the batch on the first block
//! that fails twice. Blocks already written are not rolled back.
//!
//! [`clone_dump`][clone::clone_dump] runs the whole sequence (size check,
//! classification, planning, writing) against a single session.
//!

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod clone;

pub mod dump;

pub mod engine;

mod error;
pub use error::{Error, MalformedKind};

pub mod keys;

pub mod session;

pub mod writer;

pub use dump::{Block, Dump, Position};
pub use keys::{Key, KeyMap, KeyType, SectorKeys};
