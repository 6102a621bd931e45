//! Scan history persistence round trips.

use chrono::{DateTime, Utc};
use tempfile::tempdir;
use tokio::sync::broadcast;

use vscand::core::{ScanEvent, ScanJob, ScanMode};
use vscand::db;

fn t0() -> DateTime<Utc> {
    "2026-01-15T10:00:00Z".parse().unwrap()
}

fn sample_job(id: &str, target: &str, mode: ScanMode) -> ScanJob {
    ScanJob::submitted(id, target, mode, t0())
}

#[tokio::test]
async fn upsert_and_fetch_round_trip() {
    let dir = tempdir().unwrap();
    let conn = db::init(&dir.path().join("scans.db")).await.unwrap();

    let job = sample_job("j_1", "example.com", ScanMode::Quick);
    db::scans::upsert(&conn, &job).await.unwrap();
    db::scans::append_log(
        &conn,
        "j_1".to_string(),
        "queued".to_string(),
        Some("Scan submitted, waiting for worker".to_string()),
    )
    .await
    .unwrap();

    // Progress, then completion, each mirrored into the row.
    let (job, _) = job.apply(
        ScanEvent::ProgressObserved {
            progress: 40,
            eta_seconds: Some(30),
        },
        t0(),
    );
    db::scans::upsert(&conn, &job).await.unwrap();
    let (job, _) = job.apply(ScanEvent::Completed, t0());
    db::scans::upsert(&conn, &job).await.unwrap();
    db::scans::append_log(&conn, "j_1".to_string(), "completed".to_string(), None)
        .await
        .unwrap();

    let fetched = db::scans::get_with_history(&conn, "j_1".to_string())
        .await
        .unwrap();
    assert_eq!(fetched.scan.id, "j_1");
    assert_eq!(fetched.scan.target, "example.com");
    assert_eq!(fetched.scan.mode, "quick");
    assert_eq!(fetched.scan.status, "completed");
    assert_eq!(fetched.scan.progress, 100);
    assert!(fetched.scan.finished_at.is_some());
    assert_eq!(fetched.history.len(), 2);
    assert_eq!(fetched.history[0].status, "queued");
    assert_eq!(fetched.history[1].status, "completed");
}

#[tokio::test]
async fn list_filters_and_paginates() {
    let dir = tempdir().unwrap();
    let conn = db::init(&dir.path().join("scans.db")).await.unwrap();

    for i in 0..5 {
        let mode = if i % 2 == 0 {
            ScanMode::Quick
        } else {
            ScanMode::Full
        };
        let mut job = sample_job(&format!("j_{}", i), &format!("host{}.example.com", i), mode);
        // Stagger creation times so ordering is deterministic.
        job.created_at = t0() + chrono::Duration::seconds(i);
        let job = if i < 2 {
            job.apply(ScanEvent::Completed, t0()).0
        } else {
            job
        };
        db::scans::upsert(&conn, &job).await.unwrap();
    }

    let all = db::scans::list(&conn, 50, 0, None, None).await.unwrap();
    assert_eq!(all.len(), 5);
    // Newest first.
    assert_eq!(all[0].id, "j_4");

    let completed = db::scans::list(&conn, 50, 0, Some("completed".to_string()), None)
        .await
        .unwrap();
    assert_eq!(completed.len(), 2);

    let quick = db::scans::list(&conn, 50, 0, None, Some("quick".to_string()))
        .await
        .unwrap();
    assert_eq!(quick.len(), 3);

    let quick_completed = db::scans::list(
        &conn,
        50,
        0,
        Some("completed".to_string()),
        Some("quick".to_string()),
    )
    .await
    .unwrap();
    assert_eq!(quick_completed.len(), 1);
    assert_eq!(quick_completed[0].id, "j_0");

    let page = db::scans::list(&conn, 2, 2, None, None).await.unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].id, "j_2");
}

#[tokio::test]
async fn recorder_mirrors_the_update_stream() {
    let dir = tempdir().unwrap();
    let conn = db::init(&dir.path().join("scans.db")).await.unwrap();

    let (tx, rx) = broadcast::channel(16);
    let recorder = tokio::spawn(db::scans::record_stream(conn.clone(), rx));

    let job = sample_job("j_rec", "example.com", ScanMode::Full);
    tx.send(job.clone()).unwrap();

    let (job, _) = job.apply(
        ScanEvent::ProgressObserved {
            progress: 25,
            eta_seconds: None,
        },
        t0(),
    );
    tx.send(job.clone()).unwrap();

    // A second progress update must not add another status entry.
    let (job, _) = job.apply(
        ScanEvent::ProgressObserved {
            progress: 60,
            eta_seconds: None,
        },
        t0(),
    );
    tx.send(job.clone()).unwrap();

    let (job, _) = job.apply(
        ScanEvent::Failed {
            reason: "target unreachable".to_string(),
        },
        t0(),
    );
    tx.send(job.clone()).unwrap();

    // Closing the stream stops the recorder once it has drained.
    drop(tx);
    recorder.await.unwrap();

    let fetched = db::scans::get_with_history(&conn, "j_rec".to_string())
        .await
        .unwrap();
    assert_eq!(fetched.scan.status, "failed");
    assert_eq!(fetched.scan.progress, 60);
    assert_eq!(fetched.scan.error.as_deref(), Some("target unreachable"));

    let statuses: Vec<&str> = fetched
        .history
        .iter()
        .map(|entry| entry.status.as_str())
        .collect();
    assert_eq!(statuses, vec!["queued", "running", "failed"]);
}
