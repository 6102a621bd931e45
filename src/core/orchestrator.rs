//! Scan orchestration.
//!
//! The orchestrator is the composition root of the scanning core. It owns
//! the current job snapshot and its poll session, wires the poll loop to
//! the state machine, and fans accepted transitions out to subscribers.
//! Exactly one session is active at a time: starting a new scan tears the
//! previous session down before the new job exists.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};

use super::job::{ScanEvent, ScanJob, ScanMode};
use super::job_service::{JobService, JobServiceError};
use super::poller::Poller;
use super::session::PollSession;
use super::target::{self, TargetError};

/// Capacity of the update broadcast channel. One scan at a time polling
/// every couple of seconds stays nowhere near this.
const UPDATE_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum StartScanError {
    #[error("invalid scan target: {0}")]
    InvalidTarget(#[from] TargetError),
    #[error("scan submission failed: {0}")]
    Submit(#[from] JobServiceError),
}

/// Outcome of offering an event to the shared state.
#[derive(Debug)]
pub enum Applied {
    /// The event belonged to a stale or canceled session and was dropped.
    Discarded,
    /// Event accepted; subscribers have been notified.
    Transitioned(ScanJob),
    /// Event was legal but changed nothing (late duplicate, repeated
    /// progress value).
    NoChange,
}

struct CurrentScan {
    job: ScanJob,
    session: Arc<PollSession>,
}

struct Inner {
    /// Bumped once per started scan. The installed session always carries
    /// the value current at install time.
    generation: u64,
    current: Option<CurrentScan>,
}

/// Single writer for the current scan snapshot.
///
/// All status and progress mutation funnels through [`SharedState::apply_poll`],
/// guarded by the session generation and cancellation flag, so a poll
/// response that lost a race against a cancel or a newer scan can never
/// overwrite state.
pub struct SharedState {
    inner: Mutex<Inner>,
    updates: broadcast::Sender<ScanJob>,
}

impl SharedState {
    fn new() -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            inner: Mutex::new(Inner {
                generation: 0,
                current: None,
            }),
            updates,
        }
    }

    /// Apply a poll-derived event on behalf of `session`.
    ///
    /// The response is discarded unconditionally when the session is no
    /// longer the current generation or its cancellation flag is set, even
    /// if the poll call was already in flight when either happened. This is
    /// what keeps a cancellation from being overwritten by a late progress
    /// update.
    pub(crate) async fn apply_poll(&self, session: &PollSession, event: ScanEvent) -> Applied {
        let mut inner = self.inner.lock().await;
        if inner.generation != session.generation() {
            return Applied::Discarded;
        }
        let Some(scan) = inner.current.as_mut() else {
            return Applied::Discarded;
        };
        // Cancellation is flagged under this same lock, so checking here
        // settles the race in arrival-independent order.
        if session.cancel_requested() {
            return Applied::Discarded;
        }

        let (next, changed) = scan.job.apply(event, Utc::now());
        if !changed {
            return Applied::NoChange;
        }
        scan.job = next.clone();
        let _ = self.updates.send(next.clone());
        Applied::Transitioned(next)
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Cadence of the poll loop.
    pub poll_interval: Duration,
    /// Consecutive poll failures before a warning is logged. `None` leaves
    /// the loop retrying quietly forever; the remote service is expected to
    /// recover, and a client-side error never becomes a job status.
    pub max_consecutive_poll_failures: Option<u32>,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            max_consecutive_poll_failures: None,
        }
    }
}

/// Owns the lifetime of one scan job at a time.
pub struct Orchestrator {
    service: Arc<dyn JobService>,
    shared: Arc<SharedState>,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(service: Arc<dyn JobService>, settings: OrchestratorSettings) -> Self {
        Self {
            service,
            shared: Arc::new(SharedState::new()),
            settings,
        }
    }

    /// Subscribe to job updates. Every accepted state change is delivered,
    /// from the initial queued snapshot through each terminal state exactly
    /// once. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanJob> {
        self.shared.updates.subscribe()
    }

    /// Snapshot of the most recent job, terminal or not.
    pub async fn current(&self) -> Option<ScanJob> {
        let inner = self.shared.inner.lock().await;
        inner.current.as_ref().map(|scan| scan.job.clone())
    }

    /// Snapshot of the job currently being polled, if it has not reached a
    /// terminal state yet.
    pub async fn active(&self) -> Option<ScanJob> {
        let inner = self.shared.inner.lock().await;
        inner
            .current
            .as_ref()
            .filter(|scan| scan.session.is_active() && !scan.job.status.is_terminal())
            .map(|scan| scan.job.clone())
    }

    /// Submit a new scan and begin polling it.
    ///
    /// The target is validated synchronously before any I/O. Any active
    /// session is torn down first: the generation is bumped and the old
    /// token flagged, so the old poller stops without emitting anything for
    /// its job. Submission happens exactly once; on failure the error is
    /// returned and no session exists.
    pub async fn start_scan(
        &self,
        target: &str,
        mode: ScanMode,
    ) -> Result<ScanJob, StartScanError> {
        target::validate(target)?;
        let target = target.trim();

        // The lock is held across the submit round trip: concurrent starts
        // serialize, and each one tears down its predecessor exactly once.
        let mut inner = self.shared.inner.lock().await;
        inner.generation += 1;
        let generation = inner.generation;
        if let Some(previous) = inner.current.take() {
            previous.session.request_cancel();
            debug!(job_id = %previous.job.job_id, "Tore down previous poll session");
        }

        let handle = self.service.submit(target, mode).await?;

        let job = ScanJob::submitted(&handle.job_id, target, mode, handle.created_at);
        let session = Arc::new(PollSession::new(&handle.job_id, generation));
        inner.current = Some(CurrentScan {
            job: job.clone(),
            session: session.clone(),
        });
        drop(inner);

        let _ = self.shared.updates.send(job.clone());
        info!(
            job_id = %job.job_id,
            target = %job.target,
            mode = %job.mode,
            "Scan submitted"
        );

        let poller = Poller::new(self.service.clone(), self.settings.clone());
        let shared = self.shared.clone();
        tokio::spawn(async move { poller.run(shared, session).await });

        Ok(job)
    }

    /// Cancel the active scan.
    ///
    /// Local-first and always resolves without waiting on the network: the
    /// session token is flagged before any I/O, the local `Canceled` state
    /// is applied and broadcast, and only then is a best-effort remote
    /// cancel issued in the background. A remote failure is logged and
    /// never reverts local state. Idempotent: canceling an already-terminal
    /// scan returns its existing snapshot, and with no scan at all this is
    /// a no-op.
    pub async fn cancel_scan(&self) -> Option<ScanJob> {
        let job = {
            let mut inner = self.shared.inner.lock().await;
            let scan = inner.current.as_mut()?;
            if scan.job.status.is_terminal() {
                return Some(scan.job.clone());
            }

            // Flag the token before anything else: any in-flight poll
            // response is dead from this point on, and the poll loop's
            // timer stops on its own.
            scan.session.request_cancel();

            let (next, changed) = scan.job.apply(ScanEvent::Canceled, Utc::now());
            if changed {
                scan.job = next.clone();
                let _ = self.shared.updates.send(next.clone());
            }
            next
        };

        info!(job_id = %job.job_id, "Scan canceled locally");

        // Best-effort remote cancel, off the local path.
        let service = self.service.clone();
        let job_id = job.job_id.clone();
        tokio::spawn(async move {
            if let Err(err) = service.request_cancel(&job_id).await {
                warn!(
                    job_id = %job_id,
                    error = %err,
                    "Remote cancel request failed; local cancellation stands"
                );
            }
        });

        Some(job)
    }
}
