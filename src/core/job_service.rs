//! Remote Job Service interface.
//!
//! The Job Service runs the actual scans; this client side only submits,
//! polls, and requests cancellation. Each method is a single round trip
//! with no internal retries: retry-on-failure is the poll loop's policy,
//! not the transport's. Implementations live in `crate::adapters`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::job::ScanMode;

/// Job status as reported by the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Canceled,
}

/// Returned by a successful submission.
#[derive(Debug, Clone)]
pub struct JobHandle {
    pub job_id: String,
    pub created_at: DateTime<Utc>,
}

/// One poll response.
#[derive(Debug, Clone)]
pub struct JobSnapshot {
    pub job_id: String,
    pub status: RemoteStatus,
    pub progress: u8,
    pub estimated_time_left_seconds: Option<u64>,
    /// Failure reason, populated when `status` is `failed`.
    pub error: Option<String>,
}

#[derive(Debug, Error)]
pub enum JobServiceError {
    #[error("job not found: {0}")]
    NotFound(String),
    #[error("job service rejected the request ({code}): {message}")]
    Rejected { code: u16, message: String },
    #[error("job service transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("job service unreachable: {0}")]
    Unavailable(String),
    #[error("invalid response from job service: {0}")]
    InvalidResponse(String),
}

/// RPC surface of the remote Job Service.
#[async_trait]
pub trait JobService: Send + Sync {
    /// Create a new remote scan job. Every call creates a new remote
    /// resource, so callers must submit exactly once per logical action.
    async fn submit(&self, target: &str, mode: ScanMode) -> Result<JobHandle, JobServiceError>;

    /// Fetch the current snapshot of a job.
    async fn poll(&self, job_id: &str) -> Result<JobSnapshot, JobServiceError>;

    /// Ask the remote side to cancel a job. Best-effort: the acknowledgment
    /// is advisory and local cancellation never waits on it.
    async fn request_cancel(&self, job_id: &str) -> Result<(), JobServiceError>;
}
