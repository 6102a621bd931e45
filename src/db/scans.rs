//! Scan history persistence.
//!
//! The orchestration core never touches the database. A recorder task
//! subscribes to the orchestrator update stream and writes every accepted
//! transition here: the `scans` row mirrors the latest snapshot, and
//! `scan_status_log` keeps an append-only trail of status changes.

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_rusqlite::{Connection, params, rusqlite};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::job::{ScanJob, ScanStatus};

/// One row of scan history, as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRow {
    pub id: String,
    pub target: String,
    pub mode: String,
    pub status: String,
    pub progress: u8,
    pub error: Option<String>,
    pub created_at: String,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
}

/// One entry of the status trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanStatusEntry {
    pub status: String,
    pub description: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanWithHistory {
    pub scan: ScanRow,
    pub history: Vec<ScanStatusEntry>,
}

/// Write the latest snapshot of a job, inserting or updating its row.
pub async fn upsert(conn: &Connection, job: &ScanJob) -> Result<()> {
    let job = job.clone();
    conn.call(move |c| {
        c.execute(
            "INSERT INTO scans (id, target, mode, status, progress, error, created_at, started_at, finished_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                progress = excluded.progress,
                error = excluded.error,
                started_at = excluded.started_at,
                finished_at = excluded.finished_at",
            params![
                &job.job_id,
                &job.target,
                job.mode.as_str(),
                job.status.as_str(),
                job.progress,
                &job.error,
                job.created_at.to_rfc3339(),
                job.started_at.map(|t| t.to_rfc3339()),
                job.finished_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok::<(), rusqlite::Error>(())
    })
    .await?;

    Ok(())
}

/// Append one entry to a scan's status trail.
pub async fn append_log(
    conn: &Connection,
    scan_id: String,
    status: String,
    description: Option<String>,
) -> Result<()> {
    conn.call(move |c| {
        let log_id = Uuid::now_v7().to_string();
        c.execute(
            "INSERT INTO scan_status_log (id, scan_id, status, description)
             VALUES (?1, ?2, ?3, ?4)",
            params![log_id, scan_id, status, description],
        )?;
        Ok::<(), rusqlite::Error>(())
    })
    .await?;

    Ok(())
}

/// List scans, newest first, with optional status/mode filters.
pub async fn list(
    conn: &Connection,
    limit: u32,
    offset: u32,
    status: Option<String>,
    mode: Option<String>,
) -> Result<Vec<ScanRow>> {
    conn.call(move |c| {
        let mut stmt = c.prepare(
            "SELECT id, target, mode, status, progress, error, created_at, started_at, finished_at
             FROM scans
             WHERE (?1 IS NULL OR status = ?1)
               AND (?2 IS NULL OR mode = ?2)
             ORDER BY created_at DESC
             LIMIT ?3 OFFSET ?4",
        )?;

        let rows = stmt.query_map(params![status, mode, limit, offset], |row| {
            Ok(ScanRow {
                id: row.get(0)?,
                target: row.get(1)?,
                mode: row.get(2)?,
                status: row.get(3)?,
                progress: row.get(4)?,
                error: row.get(5)?,
                created_at: row.get(6)?,
                started_at: row.get(7)?,
                finished_at: row.get(8)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>()
    })
    .await
    .map_err(|e| anyhow!("Failed to list scans: {}", e))
}

/// Fetch one scan together with its full status trail.
pub async fn get_with_history(conn: &Connection, scan_id: String) -> Result<ScanWithHistory> {
    conn.call(move |c| -> Result<ScanWithHistory, rusqlite::Error> {
        let scan = c.query_row(
            "SELECT id, target, mode, status, progress, error, created_at, started_at, finished_at
             FROM scans WHERE id = ?1",
            params![&scan_id],
            |row| {
                Ok(ScanRow {
                    id: row.get(0)?,
                    target: row.get(1)?,
                    mode: row.get(2)?,
                    status: row.get(3)?,
                    progress: row.get(4)?,
                    error: row.get(5)?,
                    created_at: row.get(6)?,
                    started_at: row.get(7)?,
                    finished_at: row.get(8)?,
                })
            },
        )?;

        let mut stmt = c.prepare(
            "SELECT status, description, created_at
             FROM scan_status_log
             WHERE scan_id = ?1
             ORDER BY created_at ASC, id ASC",
        )?;
        let history = stmt
            .query_map(params![&scan_id], |row| {
                Ok(ScanStatusEntry {
                    status: row.get(0)?,
                    description: row.get(1)?,
                    created_at: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ScanWithHistory { scan, history })
    })
    .await
    .map_err(|e| anyhow!("Failed to get scan: {}", e))
}

fn transition_description(job: &ScanJob) -> Option<String> {
    match job.status {
        ScanStatus::Queued => Some("Scan submitted, waiting for worker".to_string()),
        ScanStatus::Running => Some(format!("Progress {}%", job.progress)),
        ScanStatus::Completed => match job.duration_secs() {
            Some(secs) => Some(format!("Scan completed in {}s", secs)),
            None => Some("Scan completed".to_string()),
        },
        ScanStatus::Failed => job.error.as_ref().map(|e| format!("Scan failed: {}", e)),
        ScanStatus::Canceled => Some("Scan canceled".to_string()),
    }
}

/// Recorder task: mirrors the orchestrator update stream into the history
/// tables. The row is updated on every change; the status trail only gets
/// an entry when the status itself moves.
pub async fn record_stream(conn: Connection, mut rx: broadcast::Receiver<ScanJob>) {
    let mut last: Option<(String, ScanStatus)> = None;

    loop {
        let job = match rx.recv().await {
            Ok(job) => job,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Scan recorder lagged, snapshots skipped");
                // Resync on the next update; the row upsert self-heals.
                last = None;
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        if let Err(err) = upsert(&conn, &job).await {
            warn!(job_id = %job.job_id, error = %err, "Failed to record scan snapshot");
            continue;
        }

        let status_changed = match &last {
            Some((id, status)) => *id != job.job_id || *status != job.status,
            None => true,
        };
        if status_changed {
            let description = transition_description(&job);
            if let Err(err) = append_log(
                &conn,
                job.job_id.clone(),
                job.status.as_str().to_string(),
                description,
            )
            .await
            {
                warn!(job_id = %job.job_id, error = %err, "Failed to record status entry");
            }
        }
        last = Some((job.job_id.clone(), job.status));
    }

    debug!("Scan recorder stopped");
}
