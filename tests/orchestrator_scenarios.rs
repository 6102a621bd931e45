//! End-to-end orchestration scenarios against the simulated Job Service.
//!
//! These exercise the full submit -> poll -> terminal pipeline, including
//! the races the guard exists for: cancel against an in-flight poll, and a
//! new scan superseding a live session.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::timeout;

use vscand::adapters::{ScanScript, SimulatedJobService};
use vscand::core::{
    Orchestrator, OrchestratorSettings, ScanJob, ScanMode, ScanStatus, StartScanError,
};

const POLL: Duration = Duration::from_millis(20);

fn orchestrator() -> (Orchestrator, ScanScript) {
    let (service, script) = SimulatedJobService::new();
    let orchestrator = Orchestrator::new(
        Arc::new(service),
        OrchestratorSettings {
            poll_interval: POLL,
            max_consecutive_poll_failures: None,
        },
    );
    (orchestrator, script)
}

async fn next_update(rx: &mut broadcast::Receiver<ScanJob>) -> ScanJob {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for update")
        .expect("update channel closed")
}

async fn expect_silence(rx: &mut broadcast::Receiver<ScanJob>, wait: Duration) {
    assert!(
        timeout(wait, rx.recv()).await.is_err(),
        "expected no further updates"
    );
}

#[tokio::test]
async fn scan_runs_to_completion() {
    let (orchestrator, script) = orchestrator();
    let mut rx = orchestrator.subscribe();

    let job = orchestrator
        .start_scan("example.com", ScanMode::Quick)
        .await
        .unwrap();

    let queued = next_update(&mut rx).await;
    assert_eq!(queued.job_id, job.job_id);
    assert_eq!(queued.status, ScanStatus::Queued);
    assert_eq!(queued.progress, 0);

    script.set_progress(&job.job_id, 40, Some(60));
    let running = next_update(&mut rx).await;
    assert_eq!(running.status, ScanStatus::Running);
    assert_eq!(running.progress, 40);
    assert_eq!(running.estimated_time_left_seconds, Some(60));

    script.complete(&job.job_id);
    let completed = next_update(&mut rx).await;
    assert_eq!(completed.status, ScanStatus::Completed);
    assert_eq!(completed.progress, 100);
    assert!(completed.finished_at.is_some());

    // Exactly two updates after the initial queued one: the poll loop has
    // stopped and nothing else may arrive.
    expect_silence(&mut rx, POLL * 5).await;
}

#[tokio::test]
async fn cancellation_beats_in_flight_poll_response() {
    let (orchestrator, script) = orchestrator();
    let mut rx = orchestrator.subscribe();

    let job = orchestrator
        .start_scan("example.com", ScanMode::Quick)
        .await
        .unwrap();
    let _ = next_update(&mut rx).await; // queued

    // Make the remote side look busy, but hold every poll response in
    // flight long enough for the cancel to land first.
    script.set_progress(&job.job_id, 55, None);
    script.set_poll_delay(Duration::from_millis(200));
    tokio::time::sleep(POLL * 2).await;

    let canceled = orchestrator.cancel_scan().await.expect("had a scan");
    assert_eq!(canceled.status, ScanStatus::Canceled);

    let update = next_update(&mut rx).await;
    assert_eq!(update.status, ScanStatus::Canceled);

    // The delayed running response resolves afterwards; it must be
    // discarded without a notification.
    expect_silence(&mut rx, Duration::from_millis(400)).await;
    let current = orchestrator.current().await.unwrap();
    assert_eq!(current.status, ScanStatus::Canceled);
}

#[tokio::test]
async fn transient_poll_errors_do_not_stop_the_loop() {
    let (orchestrator, script) = orchestrator();
    let mut rx = orchestrator.subscribe();

    let job = orchestrator
        .start_scan("example.com", ScanMode::Full)
        .await
        .unwrap();
    let _ = next_update(&mut rx).await; // queued

    script.fail_next_polls(1);
    script.set_progress(&job.job_id, 10, Some(90));

    // The failed poll produces no update of any kind; the next tick
    // delivers the running snapshot as if nothing happened.
    let update = next_update(&mut rx).await;
    assert_eq!(update.status, ScanStatus::Running);
    assert_eq!(update.progress, 10);
    assert_eq!(update.estimated_time_left_seconds, Some(90));
}

#[tokio::test]
async fn empty_target_is_rejected_synchronously() {
    let (orchestrator, _script) = orchestrator();
    let mut rx = orchestrator.subscribe();

    let err = orchestrator
        .start_scan("", ScanMode::Quick)
        .await
        .unwrap_err();
    assert!(matches!(err, StartScanError::InvalidTarget(_)));
    assert!(orchestrator.current().await.is_none());

    expect_silence(&mut rx, POLL * 3).await;
}

#[tokio::test]
async fn submission_failure_leaves_no_session() {
    let (orchestrator, script) = orchestrator();
    let mut rx = orchestrator.subscribe();

    script.fail_next_submits(1);
    let err = orchestrator
        .start_scan("example.com", ScanMode::Quick)
        .await
        .unwrap_err();
    assert!(matches!(err, StartScanError::Submit(_)));
    assert!(orchestrator.current().await.is_none());
    assert!(orchestrator.active().await.is_none());

    expect_silence(&mut rx, POLL * 3).await;
}

#[tokio::test]
async fn new_scan_tears_down_previous_session() {
    let (orchestrator, script) = orchestrator();
    let mut rx = orchestrator.subscribe();

    let job_a = orchestrator
        .start_scan("first.example.com", ScanMode::Quick)
        .await
        .unwrap();
    assert_eq!(next_update(&mut rx).await.job_id, job_a.job_id);

    script.set_progress(&job_a.job_id, 10, None);
    let update = next_update(&mut rx).await;
    assert_eq!(update.job_id, job_a.job_id);
    assert_eq!(update.status, ScanStatus::Running);

    let job_b = orchestrator
        .start_scan("second.example.com", ScanMode::Full)
        .await
        .unwrap();
    assert_ne!(job_a.job_id, job_b.job_id);

    let queued_b = next_update(&mut rx).await;
    assert_eq!(queued_b.job_id, job_b.job_id);
    assert_eq!(queued_b.status, ScanStatus::Queued);

    // Job A keeps "running" remotely, but its session is dead: no update
    // referencing A may surface again.
    script.set_progress(&job_a.job_id, 90, None);
    script.set_progress(&job_b.job_id, 30, None);

    let update = next_update(&mut rx).await;
    assert_eq!(update.job_id, job_b.job_id);
    assert_eq!(update.progress, 30);

    script.complete(&job_b.job_id);
    let completed = next_update(&mut rx).await;
    assert_eq!(completed.job_id, job_b.job_id);
    assert_eq!(completed.status, ScanStatus::Completed);

    expect_silence(&mut rx, POLL * 5).await;
}

#[tokio::test]
async fn remote_failure_becomes_terminal_failed() {
    let (orchestrator, script) = orchestrator();
    let mut rx = orchestrator.subscribe();

    let job = orchestrator
        .start_scan("example.com", ScanMode::Quick)
        .await
        .unwrap();
    let _ = next_update(&mut rx).await; // queued

    script.fail(&job.job_id, "worker out of memory");
    let failed = next_update(&mut rx).await;
    assert_eq!(failed.status, ScanStatus::Failed);
    assert_eq!(failed.error.as_deref(), Some("worker out of memory"));

    expect_silence(&mut rx, POLL * 5).await;
}

#[tokio::test]
async fn remote_side_cancel_is_observed() {
    let (orchestrator, script) = orchestrator();
    let mut rx = orchestrator.subscribe();

    let job = orchestrator
        .start_scan("example.com", ScanMode::Quick)
        .await
        .unwrap();
    let _ = next_update(&mut rx).await; // queued

    script.remote_cancel(&job.job_id);
    let canceled = next_update(&mut rx).await;
    assert_eq!(canceled.status, ScanStatus::Canceled);

    expect_silence(&mut rx, POLL * 5).await;
}

#[tokio::test]
async fn cancel_after_terminal_is_idempotent() {
    let (orchestrator, script) = orchestrator();
    let mut rx = orchestrator.subscribe();

    let job = orchestrator
        .start_scan("example.com", ScanMode::Quick)
        .await
        .unwrap();
    let _ = next_update(&mut rx).await; // queued

    script.complete(&job.job_id);
    let completed = next_update(&mut rx).await;
    assert_eq!(completed.status, ScanStatus::Completed);

    // Canceling a finished scan answers with the existing terminal state
    // and emits nothing.
    let result = orchestrator.cancel_scan().await.expect("scan still known");
    assert_eq!(result.status, ScanStatus::Completed);

    expect_silence(&mut rx, POLL * 5).await;
}

#[tokio::test]
async fn cancel_without_a_scan_is_a_noop() {
    let (orchestrator, _script) = orchestrator();
    assert!(orchestrator.cancel_scan().await.is_none());
}

#[tokio::test]
async fn progress_reports_never_move_backwards() {
    let (orchestrator, script) = orchestrator();
    let mut rx = orchestrator.subscribe();

    let job = orchestrator
        .start_scan("example.com", ScanMode::Quick)
        .await
        .unwrap();
    let _ = next_update(&mut rx).await; // queued

    script.set_progress(&job.job_id, 50, None);
    assert_eq!(next_update(&mut rx).await.progress, 50);

    // A lower value from the remote changes nothing and emits nothing.
    script.set_progress(&job.job_id, 30, None);
    expect_silence(&mut rx, POLL * 5).await;

    script.set_progress(&job.job_id, 70, None);
    assert_eq!(next_update(&mut rx).await.progress, 70);
}
