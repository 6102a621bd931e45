mod slack;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::warn;

use crate::config::{NotificationChannelType, NotificationConfig};
use crate::core::job::{ScanJob, ScanMode, ScanStatus};

/// Events that trigger notifications
#[derive(Debug, Clone)]
pub enum ScanAlert {
    Started {
        job_id: String,
        target: String,
        mode: ScanMode,
    },
    Completed {
        job_id: String,
        target: String,
        duration_secs: Option<u64>,
    },
    Failed {
        job_id: String,
        target: String,
        error: String,
    },
    Canceled {
        job_id: String,
        target: String,
    },
}

impl ScanAlert {
    /// Build the alert for a job update, if the update is one worth
    /// announcing. Progress changes are not.
    fn from_update(job: &ScanJob) -> Option<Self> {
        match job.status {
            ScanStatus::Queued => Some(Self::Started {
                job_id: job.job_id.clone(),
                target: job.target.clone(),
                mode: job.mode,
            }),
            ScanStatus::Running => None,
            ScanStatus::Completed => Some(Self::Completed {
                job_id: job.job_id.clone(),
                target: job.target.clone(),
                duration_secs: job.duration_secs(),
            }),
            ScanStatus::Failed => Some(Self::Failed {
                job_id: job.job_id.clone(),
                target: job.target.clone(),
                error: job
                    .error
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_string()),
            }),
            ScanStatus::Canceled => Some(Self::Canceled {
                job_id: job.job_id.clone(),
                target: job.target.clone(),
            }),
        }
    }
}

/// Trait for notification channel implementations (Slack, Discord, etc.)
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn notify(&self, alert: ScanAlert) -> Result<()>;
}

/// Factory function to create a notifier based on config
pub fn create_notifier(config: &NotificationConfig) -> Option<Arc<dyn NotificationChannel>> {
    match &config.channel {
        NotificationChannelType::None => None,
        NotificationChannelType::Slack => {
            let webhook = config.slack_webhook.as_ref()?;
            if webhook.is_empty() {
                return None;
            }
            Some(Arc::new(slack::SlackNotifier::new(webhook.clone())))
        }
    }
}

/// Bridge task: watches the orchestrator update stream and fires an alert
/// for submissions and terminal transitions. The state machine emits each
/// terminal state exactly once, so no dedup is needed here.
pub async fn run(notifier: Arc<dyn NotificationChannel>, mut rx: broadcast::Receiver<ScanJob>) {
    loop {
        let job = match rx.recv().await {
            Ok(job) => job,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Notification stream lagged");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        if let Some(alert) = ScanAlert::from_update(&job) {
            if let Err(err) = notifier.notify(alert).await {
                warn!(job_id = %job.job_id, error = %err, "Failed to send notification");
            }
        }
    }
}
