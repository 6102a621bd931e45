//! In-memory Job Service for simulation runs and tests.
//!
//! The service half implements [`JobService`]; the [`ScanScript`] half is a
//! controller handle that scripts what the "remote" side does between
//! polls: advance progress, complete, fail, cancel, drop polls on the
//! floor. With `auto` mode the service advances progress by itself on
//! every poll, which is what `--simulation` daemon runs use.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::time::sleep;
use uuid::Uuid;

use crate::core::job::ScanMode;
use crate::core::job_service::{
    JobHandle, JobService, JobServiceError, JobSnapshot, RemoteStatus,
};

#[derive(Debug, Clone)]
struct SimJob {
    status: RemoteStatus,
    progress: u8,
    eta_seconds: Option<u64>,
    error: Option<String>,
}

struct SimState {
    jobs: Mutex<HashMap<String, SimJob>>,
    latest: Mutex<Option<String>>,
    poll_delay: Mutex<Duration>,
    failing_polls: Mutex<u32>,
    failing_submits: Mutex<u32>,
}

pub struct SimulatedJobService {
    state: Arc<SimState>,
    /// Progress added per poll; 0 means fully script-driven.
    auto_step: u8,
}

impl SimulatedJobService {
    /// Script-driven service: nothing happens unless the `ScanScript` says
    /// so. This is the variant tests use.
    pub fn new() -> (Self, ScanScript) {
        Self::with_auto_step(0)
    }

    /// Self-advancing service for `--simulation` daemon runs: every poll
    /// moves a live job forward by `step` percent until it completes.
    pub fn auto(step: u8) -> (Self, ScanScript) {
        Self::with_auto_step(step.max(1))
    }

    fn with_auto_step(auto_step: u8) -> (Self, ScanScript) {
        let state = Arc::new(SimState {
            jobs: Mutex::new(HashMap::new()),
            latest: Mutex::new(None),
            poll_delay: Mutex::new(Duration::ZERO),
            failing_polls: Mutex::new(0),
            failing_submits: Mutex::new(0),
        });
        (
            Self {
                state: state.clone(),
                auto_step,
            },
            ScanScript { state },
        )
    }
}

#[async_trait]
impl JobService for SimulatedJobService {
    async fn submit(&self, _target: &str, _mode: ScanMode) -> Result<JobHandle, JobServiceError> {
        {
            let mut failing = self.state.failing_submits.lock().unwrap();
            if *failing > 0 {
                *failing -= 1;
                return Err(JobServiceError::Rejected {
                    code: 503,
                    message: "job queue is full".to_string(),
                });
            }
        }

        let job_id = format!("j_{}", Uuid::now_v7());
        self.state.jobs.lock().unwrap().insert(
            job_id.clone(),
            SimJob {
                status: RemoteStatus::Queued,
                progress: 0,
                eta_seconds: None,
                error: None,
            },
        );
        *self.state.latest.lock().unwrap() = Some(job_id.clone());
        Ok(JobHandle {
            job_id,
            created_at: Utc::now(),
        })
    }

    async fn poll(&self, job_id: &str) -> Result<JobSnapshot, JobServiceError> {
        let delay = *self.state.poll_delay.lock().unwrap();
        if delay > Duration::ZERO {
            sleep(delay).await;
        }

        {
            let mut failing = self.state.failing_polls.lock().unwrap();
            if *failing > 0 {
                *failing -= 1;
                return Err(JobServiceError::Unavailable(
                    "simulated network error".to_string(),
                ));
            }
        }

        let mut jobs = self.state.jobs.lock().unwrap();
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| JobServiceError::NotFound(job_id.to_string()))?;

        if self.auto_step > 0
            && matches!(job.status, RemoteStatus::Queued | RemoteStatus::Running)
        {
            job.status = RemoteStatus::Running;
            job.progress = job.progress.saturating_add(self.auto_step).min(100);
            job.eta_seconds = Some(u64::from(100 - job.progress));
            if job.progress == 100 {
                job.status = RemoteStatus::Completed;
                job.eta_seconds = None;
            }
        }

        Ok(JobSnapshot {
            job_id: job_id.to_string(),
            status: job.status,
            progress: job.progress,
            estimated_time_left_seconds: job.eta_seconds,
            error: job.error.clone(),
        })
    }

    async fn request_cancel(&self, job_id: &str) -> Result<(), JobServiceError> {
        let mut jobs = self.state.jobs.lock().unwrap();
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| JobServiceError::NotFound(job_id.to_string()))?;
        // Idempotent: a terminal job acknowledges without changing.
        if matches!(job.status, RemoteStatus::Queued | RemoteStatus::Running) {
            job.status = RemoteStatus::Canceled;
            job.eta_seconds = None;
        }
        Ok(())
    }
}

/// Controller handle for the simulated service.
#[derive(Clone)]
pub struct ScanScript {
    state: Arc<SimState>,
}

impl ScanScript {
    fn with_live_job(&self, job_id: &str, update: impl FnOnce(&mut SimJob)) {
        let mut jobs = self.state.jobs.lock().unwrap();
        if let Some(job) = jobs.get_mut(job_id) {
            if matches!(job.status, RemoteStatus::Queued | RemoteStatus::Running) {
                update(job);
            }
        }
    }

    /// Mark the job running at the given progress.
    pub fn set_progress(&self, job_id: &str, progress: u8, eta_seconds: Option<u64>) {
        self.with_live_job(job_id, |job| {
            job.status = RemoteStatus::Running;
            job.progress = progress.min(100);
            job.eta_seconds = eta_seconds;
        });
    }

    pub fn complete(&self, job_id: &str) {
        self.with_live_job(job_id, |job| {
            job.status = RemoteStatus::Completed;
            job.progress = 100;
            job.eta_seconds = None;
        });
    }

    pub fn fail(&self, job_id: &str, reason: &str) {
        let reason = reason.to_string();
        self.with_live_job(job_id, |job| {
            job.status = RemoteStatus::Failed;
            job.error = Some(reason);
            job.eta_seconds = None;
        });
    }

    /// Cancel from the remote side, as the service itself might under
    /// resource pressure.
    pub fn remote_cancel(&self, job_id: &str) {
        self.with_live_job(job_id, |job| {
            job.status = RemoteStatus::Canceled;
            job.eta_seconds = None;
        });
    }

    /// Delay every poll response by `delay`, leaving it in flight long
    /// enough for something else to happen first.
    pub fn set_poll_delay(&self, delay: Duration) {
        *self.state.poll_delay.lock().unwrap() = delay;
    }

    /// Make the next `count` polls fail with a transport error.
    pub fn fail_next_polls(&self, count: u32) {
        *self.state.failing_polls.lock().unwrap() = count;
    }

    /// Make the next `count` submissions be rejected.
    pub fn fail_next_submits(&self, count: u32) {
        *self.state.failing_submits.lock().unwrap() = count;
    }

    /// Id of the most recently submitted job.
    pub fn latest_job(&self) -> Option<String> {
        self.state.latest.lock().unwrap().clone()
    }
}
