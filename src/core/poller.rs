//! Progress polling loop.
//!
//! One `Poller` drives one session: sleep an interval, check cancellation,
//! poll the Job Service once, feed the result to the state machine. The
//! loop is single-flight by construction: the next tick is not scheduled
//! until the previous poll call has settled, so two polls for the same
//! session are never in flight at once.
//!
//! Transient poll errors do not stop the loop and never produce a terminal
//! job status; the remote service is expected to recover. The loop ends on
//! a terminal status, on cancellation, or when its session goes stale.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::job::ScanEvent;
use super::job_service::{JobService, RemoteStatus};
use super::orchestrator::{Applied, OrchestratorSettings, SharedState};
use super::session::PollSession;
use crate::logging::LogThrottle;

/// Minimum gap between progress log lines.
const PROGRESS_LOG_INTERVAL: Duration = Duration::from_secs(2);

pub struct Poller {
    service: Arc<dyn JobService>,
    interval: Duration,
    max_consecutive_failures: Option<u32>,
}

impl Poller {
    pub fn new(service: Arc<dyn JobService>, settings: OrchestratorSettings) -> Self {
        Self {
            service,
            interval: settings.poll_interval,
            max_consecutive_failures: settings.max_consecutive_poll_failures,
        }
    }

    /// Run the loop until the job terminates or the session dies.
    pub async fn run(&self, shared: Arc<SharedState>, session: Arc<PollSession>) {
        let throttle = LogThrottle::new(PROGRESS_LOG_INTERVAL);
        let mut consecutive_failures: u32 = 0;

        loop {
            tokio::select! {
                _ = session.cancelled() => break,
                _ = sleep(self.interval) => {}
            }
            // A cancel that landed between the timer firing and this check
            // must still suppress the network call.
            if session.cancel_requested() {
                break;
            }

            let snapshot = match self.service.poll(session.job_id()).await {
                Ok(snapshot) => {
                    consecutive_failures = 0;
                    snapshot
                }
                Err(err) => {
                    consecutive_failures += 1;
                    debug!(
                        job_id = %session.job_id(),
                        error = %err,
                        "Poll failed, retrying next tick"
                    );
                    if self.max_consecutive_failures == Some(consecutive_failures) {
                        warn!(
                            job_id = %session.job_id(),
                            failures = consecutive_failures,
                            "Job service has not answered for {} consecutive polls",
                            consecutive_failures
                        );
                    }
                    continue;
                }
            };

            let event = match snapshot.status {
                // Still waiting for a worker; nothing to report.
                RemoteStatus::Queued => continue,
                RemoteStatus::Running => ScanEvent::ProgressObserved {
                    progress: snapshot.progress,
                    eta_seconds: snapshot.estimated_time_left_seconds,
                },
                RemoteStatus::Completed => ScanEvent::Completed,
                RemoteStatus::Failed => ScanEvent::Failed {
                    reason: snapshot
                        .error
                        .unwrap_or_else(|| "job failed remotely".to_string()),
                },
                RemoteStatus::Canceled => ScanEvent::Canceled,
            };

            match shared.apply_poll(&session, event).await {
                Applied::Discarded => {
                    debug!(job_id = %session.job_id(), "Discarded stale poll response");
                    break;
                }
                Applied::Transitioned(job) if job.status.is_terminal() => {
                    info!(
                        job_id = %job.job_id,
                        status = %job.status,
                        "Scan reached terminal state"
                    );
                    break;
                }
                Applied::Transitioned(job) => {
                    if throttle.should_log() {
                        debug!(
                            job_id = %job.job_id,
                            progress = job.progress,
                            eta_seconds = ?job.estimated_time_left_seconds,
                            "Scan progress"
                        );
                    }
                }
                Applied::NoChange => {
                    // A terminal snapshot that changed nothing means the
                    // local state already got there; the loop is done.
                    if matches!(
                        snapshot.status,
                        RemoteStatus::Completed | RemoteStatus::Failed | RemoteStatus::Canceled
                    ) {
                        break;
                    }
                }
            }
        }

        session.mark_inactive();
        debug!(job_id = %session.job_id(), "Poll loop stopped");
    }
}
