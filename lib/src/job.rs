// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Background clone jobs
//!
//! Tag I/O is blocking, so the clone workflow runs on a single
//! [spawn_blocking][tokio::task::spawn_blocking] worker with progress
//! streamed back to the caller. Cancelling closes the shared session,
//! the next write then fails as [TagLost][mct_core::session::WriteFault::TagLost].

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use log::{debug, info, warn};
use tokio::{sync::mpsc, task::JoinHandle};

use mct_core::{
    clone::{clone_dump, CloneOutcome},
    engine::Classification,
    session::{TagSession, WriteFault},
    writer::Progress,
    Block, Dump, Key, KeyMap, KeyType, Position,
};

use crate::Error;

/// Tag session shared between a [WriteJob] worker and its [Canceller]
///
/// The lock is held for each tag operation. Closing marks the session
/// closed without waiting on the lock, so a cancellation lands while a
/// write is in flight and every later operation fails as a lost tag.
pub struct SharedSession<S> {
    inner: Arc<Mutex<S>>,
    closed: Arc<AtomicBool>,
}

impl<S> Clone for SharedSession<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            closed: self.closed.clone(),
        }
    }
}

impl<S> SharedSession<S> {
    pub fn new(session: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Execute a closure with the underlying session, `None` if the
    /// worker panicked while holding the session
    pub fn with<R>(&self, f: impl FnOnce(&mut S) -> R) -> Option<R> {
        let mut s = self.inner.lock().ok()?;
        Some(f(&mut *s))
    }

    /// Check whether the session has been closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Execute a closure with the underlying session unless closed or poisoned
    fn with_open<R>(&self, f: impl FnOnce(&mut S) -> R) -> Option<R> {
        match self.is_closed() {
            true => None,
            false => self.with(f),
        }
    }
}

impl<S: TagSession> TagSession for SharedSession<S> {
    /// Reports `0` once closed or poisoned, which the clone workflow
    /// treats as a lost tag
    fn sector_count(&self) -> usize {
        self.with_open(|s| s.sector_count()).unwrap_or(0)
    }

    fn classify(
        &mut self,
        positions: &[Position],
        keys: &KeyMap,
    ) -> Result<Classification, mct_core::Error> {
        self.with_open(|s| s.classify(positions, keys))
            .unwrap_or(Err(mct_core::Error::TagLost))
    }

    fn write_block(
        &mut self,
        pos: Position,
        data: &Block,
        key: &Key,
        key_type: KeyType,
    ) -> Result<(), WriteFault> {
        self.with_open(|s| s.write_block(pos, data, key, key_type))
            .unwrap_or(Err(WriteFault::TagLost))
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);

        // Close the tag now if idle, otherwise the worker closes it on exit
        if let Ok(mut s) = self.inner.try_lock() {
            s.close();
        }
    }
}

/// Handle for cancelling a running [WriteJob]
pub struct Canceller<S> {
    session: SharedSession<S>,
}

impl<S: TagSession> Canceller<S> {
    /// Close the tag session, aborting the job at the next write
    pub fn cancel(&self) {
        info!("Cancelling write");
        self.session.clone().close();
    }
}

/// Clone running on a background worker
pub struct WriteJob<S> {
    session: SharedSession<S>,
    progress: mpsc::UnboundedReceiver<Progress>,
    handle: JoinHandle<Result<CloneOutcome, mct_core::Error>>,
}

impl<S: TagSession + Send + 'static> WriteJob<S> {
    /// Start writing `dump` to the tag with the provided keys.
    ///
    /// The session is closed once the clone completes or fails.
    pub fn spawn(session: S, dump: Arc<Dump>, keys: KeyMap) -> Self {
        let session = SharedSession::new(session);
        let (tx, rx) = mpsc::unbounded_channel();

        let mut s = session.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let r = clone_dump(&dump, &keys, &mut s, |p| {
                debug!("Wrote {} ({}/{})", p.position, p.written, p.total);

                // Receiver may have been dropped, progress is best effort
                let _ = tx.send(p);
            });

            if let Err(e) = &r {
                warn!("Clone failed: {}", e);
            }

            s.close();
            r
        });

        Self {
            session,
            progress: rx,
            handle,
        }
    }

    /// Await the next progress update, `None` once the worker has exited
    pub async fn progress(&mut self) -> Option<Progress> {
        self.progress.recv().await
    }

    /// Fetch a handle to cancel this job
    pub fn canceller(&self) -> Canceller<S> {
        Canceller {
            session: self.session.clone(),
        }
    }

    /// Fetch the shared session (for inspection once the job completes)
    pub fn session(&self) -> SharedSession<S> {
        self.session.clone()
    }

    /// Wait for the job to complete
    pub async fn wait(self) -> Result<CloneOutcome, Error> {
        let r = self.handle.await??;
        Ok(r)
    }
}
