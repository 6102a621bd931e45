//! Scan job model and lifecycle transitions.
//!
//! `ScanJob` is the authoritative snapshot of one remote scan job. All
//! mutation goes through [`ScanJob::apply`], a pure transition function:
//! given the current snapshot and an event it returns the next snapshot and
//! whether anything actually changed. Events that arrive too late (a
//! progress update after a terminal status, a duplicate `Completed`) are
//! dropped as no-ops rather than treated as errors. That tolerance is what
//! lets a poll response and a cancellation race each other safely.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scan intensity requested at submission. Immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    Quick,
    Full,
}

impl ScanMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quick => "quick",
            Self::Full => "full",
        }
    }
}

impl std::str::FromStr for ScanMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quick" => Ok(Self::Quick),
            "full" => Ok(Self::Full),
            other => Err(format!("mode must be 'quick' or 'full', got '{}'", other)),
        }
    }
}

impl std::fmt::Display for ScanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status. Transitions only along
/// queued -> running -> {completed, failed, canceled}, with
/// queued -> {failed, canceled} also legal. Terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Canceled,
}

impl ScanStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Canceled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events fed into the state machine.
///
/// Submission is the constructing event ([`ScanJob::submitted`]); everything
/// after that arrives either from the poll loop or from the cancellation
/// path.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    /// The remote side reported the job running at the given progress.
    ProgressObserved {
        progress: u8,
        eta_seconds: Option<u64>,
    },
    Completed,
    Failed { reason: String },
    Canceled,
}

/// Snapshot of one scan job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanJob {
    pub job_id: String,
    pub target: String,
    pub mode: ScanMode,
    pub status: ScanStatus,
    /// Completion percentage, 0-100. Non-decreasing while the job is live.
    pub progress: u8,
    /// Advisory remote estimate. Cleared on any terminal status.
    pub estimated_time_left_seconds: Option<u64>,
    /// Failure reason reported by the remote side, if any.
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ScanJob {
    /// Construct the initial snapshot for a freshly submitted job.
    pub fn submitted(
        job_id: impl Into<String>,
        target: impl Into<String>,
        mode: ScanMode,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            target: target.into(),
            mode,
            status: ScanStatus::Queued,
            progress: 0,
            estimated_time_left_seconds: None,
            error: None,
            created_at,
            started_at: None,
            finished_at: None,
        }
    }

    /// Apply an event, returning the next snapshot and whether it differs
    /// from the current one.
    ///
    /// Illegal events do not error: a terminal snapshot absorbs everything,
    /// and a progress report that would move progress backwards keeps the
    /// highest value seen. Callers must only act (persist, notify) when the
    /// returned flag is true.
    #[must_use]
    pub fn apply(&self, event: ScanEvent, now: DateTime<Utc>) -> (ScanJob, bool) {
        if self.status.is_terminal() {
            // Stale event from a response that lost the race. Drop it.
            return (self.clone(), false);
        }

        let mut next = self.clone();
        match event {
            ScanEvent::ProgressObserved {
                progress,
                eta_seconds,
            } => {
                next.status = ScanStatus::Running;
                if next.started_at.is_none() {
                    next.started_at = Some(now);
                }
                next.progress = next.progress.max(progress.min(100));
                next.estimated_time_left_seconds = eta_seconds;
            }
            ScanEvent::Completed => {
                next.status = ScanStatus::Completed;
                next.progress = 100;
                next.estimated_time_left_seconds = None;
                next.finished_at = Some(now);
            }
            ScanEvent::Failed { reason } => {
                next.status = ScanStatus::Failed;
                next.error = Some(reason);
                next.estimated_time_left_seconds = None;
                next.finished_at = Some(now);
            }
            ScanEvent::Canceled => {
                next.status = ScanStatus::Canceled;
                next.estimated_time_left_seconds = None;
                next.finished_at = Some(now);
            }
        }

        let changed = next != *self;
        (next, changed)
    }

    /// Wall-clock duration of the job, if it ran and finished.
    pub fn duration_secs(&self) -> Option<u64> {
        let start = self.started_at.unwrap_or(self.created_at);
        let end = self.finished_at?;
        Some((end - start).num_seconds().max(0) as u64)
    }
}
