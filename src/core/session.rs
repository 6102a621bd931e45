//! Poll session identity and cancellation intent.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;

/// One polling session for one submitted job.
///
/// A session is valid only for the job it was created for. The generation
/// number is assigned by the orchestrator and increases with every started
/// scan; a poll response is only applied while its session is still the
/// current generation and cancellation has not been requested. The
/// cancellation token is an explicit value object handed to the poll loop,
/// so cancellation intent travels with the session instead of living in
/// shared mutable state.
#[derive(Debug)]
pub struct PollSession {
    job_id: String,
    generation: u64,
    cancel: CancellationToken,
    active: AtomicBool,
}

impl PollSession {
    pub fn new(job_id: impl Into<String>, generation: u64) -> Self {
        Self {
            job_id: job_id.into(),
            generation,
            cancel: CancellationToken::new(),
            active: AtomicBool::new(true),
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Request cancellation. Synchronous, idempotent, and irrevocable: once
    /// set, no poll response for this session is ever applied again.
    pub fn request_cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once cancellation has been requested.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    /// True while the poll loop still has a tick scheduled.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Marks the session as no longer polled. Called by the poll loop on
    /// exit, whatever the reason.
    pub fn mark_inactive(&self) {
        self.active.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_is_irrevocable() {
        let session = PollSession::new("j_1", 1);
        assert!(!session.cancel_requested());

        session.request_cancel();
        assert!(session.cancel_requested());

        // A second request changes nothing.
        session.request_cancel();
        assert!(session.cancel_requested());
    }

    #[test]
    fn starts_active_until_marked() {
        let session = PollSession::new("j_1", 3);
        assert!(session.is_active());
        assert_eq!(session.generation(), 3);

        session.mark_inactive();
        assert!(!session.is_active());
    }

    #[tokio::test]
    async fn cancelled_future_resolves_after_request() {
        let session = PollSession::new("j_1", 1);
        session.request_cancel();
        // Must resolve immediately rather than hang.
        session.cancelled().await;
    }
}
