//! Architectural Contract Test: Transient Failure Recovery
//!
//! Constraints verified:
//! - A failed send never marks the id as notified
//! - A failed send leaves a `Public` pending record for the next run
//! - The next successful run delivers exactly once
//! - One failing item does not stop the others from being attempted
//! - In catch-up mode a failed item behind a newer delivery is still retried
//!
//! If this test fails, uploads can be silently lost.

mod common;

use common::*;
use std::time::Duration;
use vidnotify_core::{
    CandidateMode, EngineConfig, ItemOutcome, PersistedState, VisibilityStatus,
};

#[tokio::test]
async fn failed_send_keeps_public_pending_record() {
    let oracle = ScriptedOracle::new();
    let notifier = RecordingNotifier::new();
    notifier.set_fail_all(true);
    let engine = reconciler(&oracle, &notifier, test_engine_config());

    let mut state = PersistedState::new();
    let report = engine.reconcile_at(&mut state, &feed(&["a"]), day(0)).await;

    assert!(!state.is_notified("a"));
    let record = state.pending_record("a").expect("pending record exists");
    assert_eq!(record.last_status, VisibilityStatus::Public);
    assert_eq!(record.first_seen, day(0));
    assert_eq!(report.failed_count(), 1);
    assert!(matches!(report.outcomes[0], ItemOutcome::SendFailed { .. }));
}

#[tokio::test]
async fn next_run_delivers_exactly_once() {
    let oracle = ScriptedOracle::new();
    let notifier = RecordingNotifier::new();
    let engine = reconciler(&oracle, &notifier, test_engine_config());

    let mut state = PersistedState::new();
    let snapshot = feed(&["a"]);

    notifier.set_fail_all(true);
    engine.reconcile_at(&mut state, &snapshot, day(0)).await;

    notifier.set_fail_all(false);
    engine.reconcile_at(&mut state, &snapshot, day(1)).await;
    engine.reconcile_at(&mut state, &snapshot, day(2)).await;

    assert_eq!(notifier.attempts(), 2, "one failed attempt, one delivery");
    assert_eq!(notifier.delivered_ids(), vec!["a".to_string()]);
    assert!(state.is_notified("a"));
    assert!(state.pending_record("a").is_none());
}

#[tokio::test]
async fn one_failure_does_not_block_other_items() {
    let oracle = ScriptedOracle::new();
    let notifier = RecordingNotifier::new();
    notifier.fail_for("b");
    let config = test_engine_config().with_mode(CandidateMode::CatchUp);
    let engine = reconciler(&oracle, &notifier, config);

    let mut state = PersistedState::new();
    state.mark_notified("old");
    let report = engine
        .reconcile_at(&mut state, &feed(&["c", "b", "a", "old"]), day(0))
        .await;

    assert_eq!(notifier.attempts(), 3);
    assert_eq!(
        notifier.delivered_ids(),
        vec!["a".to_string(), "c".to_string()]
    );
    assert!(state.is_notified("a"));
    assert!(state.is_notified("c"));
    assert!(state.pending_record("b").is_some());
    assert_eq!(report.failed_count(), 1);
}

#[tokio::test]
async fn catch_up_retries_failed_item_behind_newer_delivery() {
    let oracle = ScriptedOracle::new();
    let notifier = RecordingNotifier::new();
    notifier.fail_for("b");
    let config = test_engine_config().with_mode(CandidateMode::CatchUp);
    let engine = reconciler(&oracle, &notifier, config);

    let mut state = PersistedState::new();
    state.mark_notified("old");
    let snapshot = feed(&["c", "b", "a", "old"]);
    engine.reconcile_at(&mut state, &snapshot, day(0)).await;
    assert!(state.is_notified("c"));
    assert!(!state.is_notified("b"));

    notifier.clear_failures();
    let report = engine.reconcile_at(&mut state, &snapshot, day(1)).await;

    assert_eq!(
        notifier.delivered_ids(),
        vec!["a".to_string(), "c".to_string(), "b".to_string()]
    );
    assert_eq!(report.outcomes, vec![ItemOutcome::Notified { id: "b".into() }]);
    assert!(state.is_notified("b"));
    assert!(state.pending_record("b").is_none());

    // A third run has nothing left to do
    engine.reconcile_at(&mut state, &snapshot, day(2)).await;
    assert_eq!(notifier.attempts(), 4);
}

#[tokio::test]
async fn timed_out_check_counts_as_unknown() {
    let oracle = ScriptedOracle::new().with_delay(Duration::from_secs(5));
    let notifier = RecordingNotifier::new();
    let config = EngineConfig {
        check_timeout_secs: 1,
        ..test_engine_config()
    };
    let engine = reconciler(&oracle, &notifier, config);

    let mut state = PersistedState::new();
    let report = engine.reconcile_at(&mut state, &feed(&["a"]), day(0)).await;

    assert_eq!(notifier.attempts(), 0);
    assert_eq!(
        report.outcomes,
        vec![ItemOutcome::Pending {
            id: "a".into(),
            status: VisibilityStatus::Unknown
        }]
    );
    assert_eq!(
        state.pending_record("a").map(|r| r.last_status),
        Some(VisibilityStatus::Unknown)
    );
}

#[tokio::test]
async fn unknown_status_is_pending_not_sent() {
    let oracle = ScriptedOracle::with_default(VisibilityStatus::Unknown);
    let notifier = RecordingNotifier::new();
    let engine = reconciler(&oracle, &notifier, test_engine_config());

    let mut state = PersistedState::new();
    engine.reconcile_at(&mut state, &feed(&["a"]), day(0)).await;

    oracle.set("a", VisibilityStatus::Public);
    engine.reconcile_at(&mut state, &feed(&["a"]), day(1)).await;

    assert_eq!(notifier.delivered_ids(), vec!["a".to_string()]);
    assert!(state.pending().is_empty());
}
