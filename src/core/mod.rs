pub mod job;
pub mod job_service;
pub mod notifications;
pub mod orchestrator;
pub mod poller;
pub mod session;
pub mod target;

pub use job::{ScanEvent, ScanJob, ScanMode, ScanStatus};
pub use job_service::{JobHandle, JobService, JobServiceError, JobSnapshot, RemoteStatus};
pub use orchestrator::{Orchestrator, OrchestratorSettings, StartScanError};
pub use session::PollSession;
