use super::{NotificationChannel, ScanAlert};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

pub struct SlackNotifier {
    webhook_url: String,
    client: reqwest::Client,
}

impl SlackNotifier {
    pub fn new(webhook_url: String) -> Self {
        Self {
            webhook_url,
            client: reqwest::Client::new(),
        }
    }

    fn format_message(&self, alert: &ScanAlert) -> serde_json::Value {
        match alert {
            ScanAlert::Started {
                job_id,
                target,
                mode,
            } => {
                let short_id = &job_id[..8.min(job_id.len())];
                json!({
                    "blocks": [
                        {
                            "type": "header",
                            "text": {
                                "type": "plain_text",
                                "text": "Scan Started",
                                "emoji": true
                            }
                        },
                        {
                            "type": "section",
                            "fields": [
                                {
                                    "type": "mrkdwn",
                                    "text": format!("*Target:*\n{}", target)
                                },
                                {
                                    "type": "mrkdwn",
                                    "text": format!("*Job ID:*\n`{}`", short_id)
                                },
                                {
                                    "type": "mrkdwn",
                                    "text": format!("*Mode:*\n{}", mode)
                                }
                            ]
                        }
                    ]
                })
            }
            ScanAlert::Completed {
                job_id,
                target,
                duration_secs,
            } => {
                let short_id = &job_id[..8.min(job_id.len())];
                let duration = match duration_secs {
                    Some(secs) => format!("{}s", secs),
                    None => "-".to_string(),
                };
                json!({
                    "blocks": [
                        {
                            "type": "header",
                            "text": {
                                "type": "plain_text",
                                "text": "Scan Complete",
                                "emoji": true
                            }
                        },
                        {
                            "type": "section",
                            "fields": [
                                {
                                    "type": "mrkdwn",
                                    "text": format!("*Target:*\n{}", target)
                                },
                                {
                                    "type": "mrkdwn",
                                    "text": format!("*Job ID:*\n`{}`", short_id)
                                },
                                {
                                    "type": "mrkdwn",
                                    "text": format!("*Duration:*\n{}", duration)
                                }
                            ]
                        }
                    ]
                })
            }
            ScanAlert::Failed {
                job_id,
                target,
                error,
            } => {
                let short_id = &job_id[..8.min(job_id.len())];
                json!({
                    "blocks": [
                        {
                            "type": "header",
                            "text": {
                                "type": "plain_text",
                                "text": "Scan Failed",
                                "emoji": true
                            }
                        },
                        {
                            "type": "section",
                            "fields": [
                                {
                                    "type": "mrkdwn",
                                    "text": format!("*Target:*\n{}", target)
                                },
                                {
                                    "type": "mrkdwn",
                                    "text": format!("*Job ID:*\n`{}`", short_id)
                                }
                            ]
                        },
                        {
                            "type": "section",
                            "text": {
                                "type": "mrkdwn",
                                "text": format!("*Error:*\n```{}```", error)
                            }
                        }
                    ]
                })
            }
            ScanAlert::Canceled { job_id, target } => {
                let short_id = &job_id[..8.min(job_id.len())];
                json!({
                    "blocks": [
                        {
                            "type": "header",
                            "text": {
                                "type": "plain_text",
                                "text": "Scan Canceled",
                                "emoji": true
                            }
                        },
                        {
                            "type": "section",
                            "fields": [
                                {
                                    "type": "mrkdwn",
                                    "text": format!("*Target:*\n{}", target)
                                },
                                {
                                    "type": "mrkdwn",
                                    "text": format!("*Job ID:*\n`{}`", short_id)
                                }
                            ]
                        }
                    ]
                })
            }
        }
    }
}

#[async_trait]
impl NotificationChannel for SlackNotifier {
    async fn notify(&self, alert: ScanAlert) -> Result<()> {
        let payload = self.format_message(&alert);
        self.client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?;
        Ok(())
    }
}
