use mct_core::{
    engine::{resolve, Classification, WriteAccess},
    session::WriteFault,
    writer::{execute, execute_with_progress, Progress, WRITE_ATTEMPTS},
    Error, KeyMap, Position, SectorKeys,
};

mod helpers;
use helpers::*;

fn keys_for(sectors: &[u8]) -> KeyMap {
    sectors
        .iter()
        .map(|s| (*s, SectorKeys::new(Some(KEY_A), Some(KEY_B))))
        .collect()
}

#[test]
fn writes_in_sector_block_order() -> anyhow::Result<()> {
    init_logging();

    let dump = dump_with(&[(2, 4), (5, 4)]);
    let requested = [(5, 3), (2, 3), (5, 0), (2, 1), (2, 0)].map(|(s, b)| Position::new(s, b));
    let classification: Classification = requested
        .iter()
        .map(|p| (*p, WriteAccess::KeyAOrB))
        .collect();

    let plan = resolve(requested, &classification, &keys_for(&[2, 5]));

    let mut s = RecordingSession::new(16);
    let n = execute(&plan, &dump, &mut s)?;

    assert_eq!(n, 5);
    assert_eq!(s.written(), vec![(2, 0), (2, 1), (2, 3), (5, 0), (5, 3)]);

    // Payloads come from the dump
    for (p, data, key, _) in &s.writes {
        assert_eq!(data[0], (p.sector << 4) | p.block);
        assert_eq!(key, &KEY_A);
    }

    // Writer leaves the session open
    assert!(!s.closed);

    Ok(())
}

#[test]
fn trailer_written_after_sector_data() -> anyhow::Result<()> {
    let dump = dump_with(&[(1, 4)]);
    let classification: Classification = [
        (Position::new(1, 0), WriteAccess::KeyB),
        (Position::new(1, 1), WriteAccess::KeyB),
        (Position::new(1, 2), WriteAccess::KeyB),
        (Position::new(1, 3), WriteAccess::TrailerKeyB),
    ]
    .into_iter()
    .collect();

    let plan = resolve(dump.known_positions(), &classification, &keys_for(&[1]));

    let mut s = RecordingSession::new(16);
    execute(&plan, &dump, &mut s)?;

    assert_eq!(s.written().last(), Some(&(1, 3)));

    Ok(())
}

#[test]
fn retry_once_then_continue() -> anyhow::Result<()> {
    let dump = dump_with(&[(0, 4)]);
    let mut s = RecordingSession::new(16)
        .classify_all(&dump, WriteAccess::KeyA)
        .fail(Position::new(0, 1), 1);

    let plan = resolve(dump.known_positions(), &s.classification(), &keys_for(&[0]));
    let n = execute(&plan, &dump, &mut s)?;

    assert_eq!(n, 4);
    assert_eq!(s.written(), vec![(0, 0), (0, 1), (0, 1), (0, 2), (0, 3)]);

    Ok(())
}

#[test]
fn abort_on_failed_block() {
    init_logging();

    let dump = dump_with(&[(2, 4), (3, 4), (4, 4)]);
    let failed = Position::new(3, 1);
    let mut s = RecordingSession::new(16)
        .classify_all(&dump, WriteAccess::KeyAOrB)
        .fail(failed, WRITE_ATTEMPTS);

    let plan = resolve(
        dump.known_positions(),
        &s.classification(),
        &keys_for(&[2, 3, 4]),
    );

    let mut progress = vec![];
    let r = execute_with_progress(&plan, &dump, &mut s, |p| progress.push(p));

    assert_eq!(
        r,
        Err(Error::WriteFailed {
            sector: 3,
            block: 1,
            fault: WriteFault::Rejected
        })
    );
    assert_eq!(r.unwrap_err().failed_position(), Some(failed));

    // Everything before the failure was written, nothing after was attempted
    assert_eq!(
        s.written(),
        vec![(2, 0), (2, 1), (2, 2), (2, 3), (3, 0), (3, 1), (3, 1)]
    );
    assert_eq!(progress.len(), 5);
    assert_eq!(
        progress.last(),
        Some(&Progress {
            position: Position::new(3, 0),
            written: 5,
            total: 12,
        })
    );
}

#[test]
fn tag_lost() {
    let dump = dump_with(&[(0, 4)]);
    let mut s = RecordingSession::new(16).classify_all(&dump, WriteAccess::KeyA);
    let plan = resolve(dump.known_positions(), &s.classification(), &keys_for(&[0]));

    s.closed = true;
    let r = execute(&plan, &dump, &mut s);

    assert_eq!(
        r,
        Err(Error::WriteFailed {
            sector: 0,
            block: 0,
            fault: WriteFault::TagLost
        })
    );
    assert!(r.unwrap_err().is_tag_lost());
}

#[test]
fn empty_plan_writes_nothing() -> anyhow::Result<()> {
    let dump = dump_with(&[(0, 4)]);
    let plan = resolve([], &Classification::new(), &KeyMap::new());

    let mut s = RecordingSession::new(16);
    let n = execute(&plan, &dump, &mut s)?;

    assert_eq!(n, 0);
    assert!(s.writes.is_empty());

    Ok(())
}

#[test]
fn missing_payload_before_any_write() {
    let dump = dump_with(&[(0, 4)]);

    // Plan covers a sector absent from the dump
    let classification: Classification = [
        (Position::new(0, 0), WriteAccess::KeyA),
        (Position::new(7, 0), WriteAccess::KeyA),
    ]
    .into_iter()
    .collect();
    let plan = resolve(
        classification.iter().map(|(p, _)| p),
        &classification,
        &keys_for(&[0, 7]),
    );

    let mut s = RecordingSession::new(16);
    let r = execute(&plan, &dump, &mut s);

    assert_eq!(r, Err(Error::MissingPayload(Position::new(7, 0))));
    assert!(s.writes.is_empty());
}
