//! HTTP adapter for the remote Job Service.
//!
//! Speaks the service's JSON API: `POST /jobs` to submit, `GET /jobs/{id}`
//! to poll, `POST /jobs/{id}/cancel` to request cancellation. One round
//! trip per call, no retries; the poll loop owns retry policy.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::core::job::ScanMode;
use crate::core::job_service::{
    JobHandle, JobService, JobServiceError, JobSnapshot, RemoteStatus,
};

pub struct HttpJobService {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct SubmitRequest<'a> {
    target: &'a str,
    mode: ScanMode,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponse {
    job_id: String,
    created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotResponse {
    job_id: String,
    status: RemoteStatus,
    #[serde(default)]
    progress: u8,
    #[serde(default)]
    estimated_time_left_seconds: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: serde_json::Value,
}

impl HttpJobService {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Pull the error message out of a non-success response body, falling
    /// back to the HTTP reason phrase.
    async fn rejection(response: reqwest::Response) -> JobServiceError {
        let status = response.status();
        let message = match response.json::<ErrorBody>().await {
            Ok(ErrorBody { error: Some(detail) }) => match detail.message.as_str() {
                Some(text) => text.to_string(),
                None => detail.message.to_string(),
            },
            _ => status
                .canonical_reason()
                .unwrap_or("request rejected")
                .to_string(),
        };
        JobServiceError::Rejected {
            code: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl JobService for HttpJobService {
    async fn submit(&self, target: &str, mode: ScanMode) -> Result<JobHandle, JobServiceError> {
        let response = self
            .client
            .post(self.url("/jobs"))
            .json(&SubmitRequest { target, mode })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        let body: SubmitResponse = response
            .json()
            .await
            .map_err(|err| JobServiceError::InvalidResponse(err.to_string()))?;
        Ok(JobHandle {
            job_id: body.job_id,
            created_at: body.created_at,
        })
    }

    async fn poll(&self, job_id: &str) -> Result<JobSnapshot, JobServiceError> {
        let response = self
            .client
            .get(self.url(&format!("/jobs/{}", job_id)))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(JobServiceError::NotFound(job_id.to_string()));
        }
        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        let body: SnapshotResponse = response
            .json()
            .await
            .map_err(|err| JobServiceError::InvalidResponse(err.to_string()))?;
        Ok(JobSnapshot {
            job_id: body.job_id,
            status: body.status,
            progress: body.progress,
            estimated_time_left_seconds: body.estimated_time_left_seconds,
            error: body.error,
        })
    }

    async fn request_cancel(&self, job_id: &str) -> Result<(), JobServiceError> {
        let response = self
            .client
            .post(self.url(&format!("/jobs/{}/cancel", job_id)))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(JobServiceError::NotFound(job_id.to_string()));
        }
        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_snapshot_with_optional_fields_missing() {
        let json = r#"{"jobId":"j_1","status":"queued","progress":0,"createdAt":"2026-01-15T10:00:00Z"}"#;
        let snapshot: SnapshotResponse = serde_json::from_str(json).unwrap();

        assert_eq!(snapshot.job_id, "j_1");
        assert_eq!(snapshot.status, RemoteStatus::Queued);
        assert_eq!(snapshot.progress, 0);
        assert!(snapshot.estimated_time_left_seconds.is_none());
        assert!(snapshot.error.is_none());
    }

    #[test]
    fn parses_running_snapshot() {
        let json = r#"{
            "jobId": "j_2",
            "status": "running",
            "progress": 40,
            "estimatedTimeLeftSeconds": 75,
            "createdAt": "2026-01-15T10:00:00Z",
            "startedAt": "2026-01-15T10:00:02Z"
        }"#;
        let snapshot: SnapshotResponse = serde_json::from_str(json).unwrap();

        assert_eq!(snapshot.status, RemoteStatus::Running);
        assert_eq!(snapshot.progress, 40);
        assert_eq!(snapshot.estimated_time_left_seconds, Some(75));
    }

    #[test]
    fn serializes_submit_request_in_wire_shape() {
        let body = serde_json::to_value(SubmitRequest {
            target: "example.com",
            mode: ScanMode::Quick,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"target": "example.com", "mode": "quick"}));
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let service = HttpJobService::new("http://localhost:9400/".to_string());
        assert_eq!(service.url("/jobs"), "http://localhost:9400/jobs");
    }
}
