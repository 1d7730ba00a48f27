//! Tests for debounced draft sessions.
//!
//! All of these run on a paused clock, so sleeps advance virtual time only.

mod support;

use std::sync::Arc;
use std::time::Duration;

use support::{config, entry, init_tracing, slot, FakeProbe, Reply};
use timetable_engine::{
    ConflictDetector, ConflictSource, ConflictStatus, Day, DraftEntry, DraftField, DraftSession,
    EngineConfig, OwnerRef, TimetableCollection, TimetableError,
};

fn session_with(probe: &Arc<FakeProbe>, timetable: TimetableCollection) -> DraftSession {
    init_tracing();
    let config = config();
    let detector = Arc::new(ConflictDetector::new(probe.clone(), &config));
    DraftSession::new(detector, timetable, &config).unwrap()
}

fn empty_timetable() -> TimetableCollection {
    TimetableCollection::new(OwnerRef::new("group-1"))
}

async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn rapid_edits_issue_one_probe_with_last_values() {
    let probe = FakeProbe::scripted([]);
    let mut session = session_with(&probe, empty_timetable());
    session.replace_draft(DraftEntry::new("Monday", "09:00", "10:00"));

    for end in ["10:15", "10:30", "10:45", "11:00"] {
        advance(100).await;
        session.edit(DraftField::EndTime, end);
    }
    assert_eq!(session.status(), ConflictStatus::Checking);
    assert_eq!(probe.call_count(), 0, "nothing fires inside the debounce window");

    advance(600).await;

    assert_eq!(session.probes_issued(), 1);
    let calls = probe.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, entry(Day::Monday, "09:00", "11:00"));
    assert_eq!(session.status().has_conflict(), Some(false));
}

#[tokio::test(start_paused = true)]
async fn probe_fires_only_after_quiet_period() {
    let probe = FakeProbe::scripted([]);
    let mut session = session_with(&probe, empty_timetable());

    session.replace_draft(DraftEntry::new("Tuesday", "13:00", "14:00"));
    advance(499).await;
    assert_eq!(probe.call_count(), 0);

    advance(2).await;
    assert_eq!(probe.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn superseded_probe_result_is_discarded() {
    let probe = FakeProbe::scripted([
        // First probe is slow and would report a conflict.
        Reply::conflict("stale", Vec::new()).after(Duration::from_secs(2)),
        Reply::clear(),
    ]);
    let mut session = session_with(&probe, empty_timetable());

    session.replace_draft(DraftEntry::new("Wednesday", "14:00", "15:00"));
    advance(600).await; // first probe in flight until t = 2.5s
    assert_eq!(session.probes_issued(), 1);

    session.edit(DraftField::StartTime, "14:30");
    advance(600).await; // edit at t = 0.6s, second probe fires and answers at t = 1.1s
    assert_eq!(session.status().has_conflict(), Some(false));

    advance(2_000).await; // first probe resolves into a dead generation
    assert_eq!(session.stale_discards(), 1);
    assert_eq!(session.status().has_conflict(), Some(false));
    assert_eq!(session.probes_issued(), 2);
}

#[tokio::test(start_paused = true)]
async fn local_conflict_shows_immediately_and_skips_probe() {
    let probe = FakeProbe::scripted([]);
    let mut timetable = empty_timetable();
    timetable.add(entry(Day::Monday, "09:00", "10:00")).unwrap();
    let mut session = session_with(&probe, timetable);

    session.replace_draft(DraftEntry::new("Monday", "09:30", "10:30"));

    match session.status() {
        ConflictStatus::Resolved(result) => {
            assert!(result.has_conflict);
            assert_eq!(result.source, ConflictSource::Local);
        }
        other => panic!("expected a local conflict, got {other:?}"),
    }
    assert!(!session.can_commit());

    advance(1_000).await;
    assert_eq!(probe.call_count(), 0);
    assert!(matches!(session.commit(), Err(TimetableError::Conflict(_))));
}

#[tokio::test(start_paused = true)]
async fn unreadable_and_inverted_drafts_are_not_probed() {
    let probe = FakeProbe::scripted([]);
    let mut session = session_with(&probe, empty_timetable());

    session.replace_draft(DraftEntry::new("Monday", "nine", "10:00"));
    assert_eq!(session.status(), ConflictStatus::Idle);

    session.edit(DraftField::StartTime, "10:00");
    assert!(matches!(session.status(), ConflictStatus::Invalid(_)));
    assert!(!session.can_commit());

    advance(1_000).await;
    assert_eq!(probe.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn commit_waits_for_pending_check() {
    let probe = FakeProbe::scripted([]);
    let mut session = session_with(&probe, empty_timetable());

    session.replace_draft(DraftEntry::new("Thursday", "08:00", "09:00"));
    assert_eq!(session.commit(), Err(TimetableError::CheckPending));

    advance(600).await;
    assert!(session.can_commit());
    assert_eq!(session.commit(), Ok(0));

    assert_eq!(session.collection().len(), 1);
    assert_eq!(session.draft(), &DraftEntry::default());
    assert_eq!(session.status(), ConflictStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn finished_session_hands_back_committed_timetable() {
    let probe = FakeProbe::scripted([
        Reply::clear().after(Duration::from_secs(1)),
        Reply::clear().after(Duration::from_secs(1)),
    ]);
    let mut timetable = empty_timetable();
    timetable.add(entry(Day::Monday, "09:00", "10:00")).unwrap();
    let mut session = session_with(&probe, timetable);

    session.replace_draft(DraftEntry::new("Tuesday", "09:00", "10:00"));
    advance(2_000).await;
    assert_eq!(session.commit(), Ok(1));

    // The next check is still in flight when the session ends.
    session.replace_draft(DraftEntry::new("Wednesday", "09:00", "10:00"));
    advance(600).await;
    assert_eq!(session.status(), ConflictStatus::Checking);

    let timetable = session.into_collection();
    assert_eq!(timetable.owner, OwnerRef::new("group-1"));
    assert_eq!(timetable.len(), 2);
    assert_eq!(timetable.entries()[1].day, Day::Tuesday);

    advance(2_000).await;
    assert_eq!(probe.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn selecting_alternative_replaces_slot_and_clears_conflict() {
    let alternatives = vec![slot(Day::Wednesday, "15:00", "16:00")];
    let probe = FakeProbe::scripted([Reply::conflict(
        "This time slot conflicts with existing schedules for 1 professor(s).",
        alternatives.clone(),
    )]);
    let mut session = session_with(&probe, empty_timetable());

    session.replace_draft(DraftEntry::new("Wednesday", "14:00", "15:00"));
    advance(600).await;
    assert_eq!(session.status().has_conflict(), Some(true));
    assert_eq!(session.status().alternatives(), alternatives.as_slice());

    session.apply_alternative(&alternatives[0]);

    assert_eq!(session.draft().day, "Wednesday");
    assert_eq!(session.draft().start_time, "15:00");
    assert_eq!(session.draft().end_time, "16:00");
    assert_eq!(session.status(), ConflictStatus::Idle);
    assert!(session.status().alternatives().is_empty());

    advance(1_000).await;
    assert_eq!(probe.call_count(), 1, "applying an alternative does not re-probe");
    assert_eq!(session.commit(), Ok(0));
}

#[tokio::test(start_paused = true)]
async fn network_failure_does_not_block_adding() {
    let probe = FakeProbe::scripted([Reply::network_error()]);
    let mut session = session_with(&probe, empty_timetable());

    session.replace_draft(DraftEntry::new("Friday", "10:00", "11:00"));
    advance(600).await;

    match session.status() {
        ConflictStatus::Resolved(result) => {
            assert!(!result.has_conflict);
            assert!(result.alternatives.is_empty());
            assert_eq!(result.source, ConflictSource::ProbeFailure);
        }
        other => panic!("expected a resolved status, got {other:?}"),
    }
    assert!(session.commit().is_ok());
}

#[tokio::test(start_paused = true)]
async fn subscribers_see_status_changes() {
    let probe = FakeProbe::scripted([]);
    let mut session = session_with(&probe, empty_timetable());
    let mut status = session.subscribe();

    session.replace_draft(DraftEntry::new("Monday", "08:00", "09:00"));
    assert_eq!(*status.borrow_and_update(), ConflictStatus::Checking);

    status.changed().await.unwrap();
    assert_eq!(status.borrow().has_conflict(), Some(false));
}

#[tokio::test(start_paused = true)]
async fn removing_entry_rechecks_draft() {
    let probe = FakeProbe::scripted([]);
    let mut timetable = empty_timetable();
    timetable.add(entry(Day::Monday, "09:00", "10:00")).unwrap();
    let mut session = session_with(&probe, timetable);

    session.replace_draft(DraftEntry::new("Monday", "09:00", "10:00"));
    assert_eq!(session.status().has_conflict(), Some(true));

    assert!(session.remove(0).is_some());
    assert_eq!(session.status(), ConflictStatus::Checking);

    advance(600).await;
    assert_eq!(session.status().has_conflict(), Some(false));
}

#[test]
fn session_needs_a_runtime() {
    let probe = FakeProbe::scripted([]);
    let config = EngineConfig::default();
    let detector = Arc::new(ConflictDetector::new(probe, &config));

    assert!(matches!(
        DraftSession::new(detector, empty_timetable(), &config),
        Err(TimetableError::Config(_))
    ));
}
