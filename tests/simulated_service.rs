//! Behavior of the simulated Job Service and its script controller.

use std::time::Duration;

use vscand::adapters::SimulatedJobService;
use vscand::core::{JobService, JobServiceError, RemoteStatus, ScanMode};

#[tokio::test]
async fn submit_creates_a_queued_job() {
    let (service, script) = SimulatedJobService::new();

    let handle = service.submit("example.com", ScanMode::Quick).await.unwrap();
    assert!(handle.job_id.starts_with("j_"));
    assert_eq!(script.latest_job().as_deref(), Some(handle.job_id.as_str()));

    let snapshot = service.poll(&handle.job_id).await.unwrap();
    assert_eq!(snapshot.status, RemoteStatus::Queued);
    assert_eq!(snapshot.progress, 0);
}

#[tokio::test]
async fn poll_unknown_job_is_not_found() {
    let (service, _script) = SimulatedJobService::new();

    let err = service.poll("j_missing").await.unwrap_err();
    assert!(matches!(err, JobServiceError::NotFound(_)));
}

#[tokio::test]
async fn scripted_progress_and_completion() {
    let (service, script) = SimulatedJobService::new();
    let handle = service.submit("example.com", ScanMode::Full).await.unwrap();

    script.set_progress(&handle.job_id, 35, Some(120));
    let snapshot = service.poll(&handle.job_id).await.unwrap();
    assert_eq!(snapshot.status, RemoteStatus::Running);
    assert_eq!(snapshot.progress, 35);
    assert_eq!(snapshot.estimated_time_left_seconds, Some(120));

    script.complete(&handle.job_id);
    let snapshot = service.poll(&handle.job_id).await.unwrap();
    assert_eq!(snapshot.status, RemoteStatus::Completed);
    assert_eq!(snapshot.progress, 100);
}

#[tokio::test]
async fn auto_mode_advances_to_completion() {
    let (service, _script) = SimulatedJobService::auto(50);
    let handle = service.submit("example.com", ScanMode::Quick).await.unwrap();

    let first = service.poll(&handle.job_id).await.unwrap();
    assert_eq!(first.status, RemoteStatus::Running);
    assert_eq!(first.progress, 50);

    let second = service.poll(&handle.job_id).await.unwrap();
    assert_eq!(second.status, RemoteStatus::Completed);
    assert_eq!(second.progress, 100);

    // Terminal jobs stay put on further polls.
    let third = service.poll(&handle.job_id).await.unwrap();
    assert_eq!(third.status, RemoteStatus::Completed);
}

#[tokio::test]
async fn cancel_request_is_idempotent() {
    let (service, script) = SimulatedJobService::new();
    let handle = service.submit("example.com", ScanMode::Quick).await.unwrap();

    service.request_cancel(&handle.job_id).await.unwrap();
    let snapshot = service.poll(&handle.job_id).await.unwrap();
    assert_eq!(snapshot.status, RemoteStatus::Canceled);

    // Canceling again, or after completion elsewhere, still acknowledges.
    service.request_cancel(&handle.job_id).await.unwrap();
    let snapshot = service.poll(&handle.job_id).await.unwrap();
    assert_eq!(snapshot.status, RemoteStatus::Canceled);

    // A terminal job cannot be revived by the script either.
    script.set_progress(&handle.job_id, 10, None);
    let snapshot = service.poll(&handle.job_id).await.unwrap();
    assert_eq!(snapshot.status, RemoteStatus::Canceled);
}

#[tokio::test]
async fn failed_polls_recover() {
    let (service, script) = SimulatedJobService::new();
    let handle = service.submit("example.com", ScanMode::Quick).await.unwrap();

    script.fail_next_polls(2);

    assert!(matches!(
        service.poll(&handle.job_id).await.unwrap_err(),
        JobServiceError::Unavailable(_)
    ));
    assert!(service.poll(&handle.job_id).await.is_err());
    assert!(service.poll(&handle.job_id).await.is_ok());
}

#[tokio::test]
async fn poll_delay_holds_the_response() {
    let (service, script) = SimulatedJobService::new();
    let handle = service.submit("example.com", ScanMode::Quick).await.unwrap();

    script.set_poll_delay(Duration::from_millis(50));

    let started = std::time::Instant::now();
    service.poll(&handle.job_id).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(50));
}

#[tokio::test]
async fn rejected_submission() {
    let (service, script) = SimulatedJobService::new();
    script.fail_next_submits(1);

    let err = service
        .submit("example.com", ScanMode::Quick)
        .await
        .unwrap_err();
    assert!(matches!(err, JobServiceError::Rejected { code: 503, .. }));
    assert!(script.latest_job().is_none());

    // The rejection was one-shot.
    assert!(service.submit("example.com", ScanMode::Quick).await.is_ok());
}
