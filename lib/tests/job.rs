use std::sync::Arc;

use mct_clone::{CloneStatus, CloneSummary, Connect, Error, Position, SimProvider, WriteJob};
use mct_core::{clone::CloneOutcome, session::WriteFault};
use mct_sim::{Layout, SimTag};

mod helpers;
use helpers::*;

#[tokio::test(flavor = "multi_thread")]
async fn clone_with_progress() -> anyhow::Result<()> {
    init_logging();

    let d = Arc::new(dump());
    let p = SimProvider::blank(Layout::Classic1k).with_magic(true);

    let t = p.connect().await?;
    let keys = t.map_keys(d.extracted_keys());

    let mut job = WriteJob::spawn(t, d.clone(), keys);

    let mut updates = vec![];
    while let Some(p) = job.progress().await {
        updates.push(p);
    }

    let session = job.session();
    let r = job.wait().await;

    let summary = CloneSummary::new(&r, updates.last());
    assert_eq!(summary.status, CloneStatus::Written);
    assert_eq!(summary.written, 64);

    assert!(matches!(r?, CloneOutcome::Written(s) if s.written == 64));
    assert_eq!(updates.len(), 64);
    assert!(updates.windows(2).all(|w| w[0].position < w[1].position));

    // Session closed on completion, image matches the dump
    let (connected, lines) = session
        .with(|t| (t.is_connected(), t.to_dump_lines()))
        .unwrap();
    assert!(!connected);
    assert_eq!(lines, dump_lines());

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_write_aborts() -> anyhow::Result<()> {
    init_logging();

    let d = Arc::new(dump());

    let mut t = SimTag::new(Layout::Classic1k).with_magic(true);
    t.fail_writes(Position::new(1, 1), 2, WriteFault::Rejected);
    let keys = t.map_keys(d.extracted_keys());

    let mut job = WriteJob::spawn(t, d, keys);

    let mut last = None;
    while let Some(p) = job.progress().await {
        last = Some(p);
    }

    let session = job.session();
    let r = job.wait().await;

    let summary = CloneSummary::new(&r, last.as_ref());
    assert_eq!(summary.status, CloneStatus::Failed);
    assert_eq!(summary.failed_at.as_deref(), Some("1:1"));
    assert_eq!(summary.written, 5);
    assert!(summary.is_partial());

    // Sector 0 and block 1:0 were written before the abort
    let b = session.with(|t| t.block(Position::new(1, 0)).copied()).unwrap();
    assert_eq!(b, Some([0x11; 16]));

    match r {
        Err(Error::Engine(e)) => assert_eq!(e.failed_position(), Some(Position::new(1, 1))),
        r => panic!("unexpected result: {r:?}"),
    }

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn cancel_aborts() -> anyhow::Result<()> {
    init_logging();

    let d = Arc::new(dump());
    let t = SimTag::new(Layout::Classic1k).with_magic(true);
    let keys = t.map_keys(d.extracted_keys());
    let (t, parked, release) = GatedTag::new(t);

    let mut job = WriteJob::spawn(t, d, keys);

    // Cancel while the first write is still in flight
    parked.await?;
    job.canceller().cancel();
    let _ = release.send(());

    let mut updates = vec![];
    while let Some(p) = job.progress().await {
        updates.push(p);
    }

    let session = job.session();
    let r = job.wait().await;

    let summary = CloneSummary::new(&r, updates.last());
    assert_eq!(summary.status, CloneStatus::Failed);
    assert_eq!(summary.failed_at.as_deref(), Some("0:1"));

    match r {
        Err(Error::Engine(e)) => assert!(e.is_tag_lost()),
        r => panic!("unexpected result: {r:?}"),
    }

    // Only the in-flight write completed, nothing reached the tag afterwards
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].written, 1);
    assert_eq!(updates[0].position, Position::new(0, 0));

    let (connected, journal) = session
        .with(|g| (g.tag.is_connected(), g.tag.journal().len()))
        .unwrap();
    assert!(!connected);
    assert_eq!(journal, 1);

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn no_tag() {
    let p = SimProvider::default();
    assert!(matches!(p.connect().await, Err(Error::NoTag)));
}
