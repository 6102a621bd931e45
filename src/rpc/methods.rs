//! RPC method handlers.
//!
//! Dispatches JSON-RPC method calls to the orchestrator and the history
//! store. This is the single write path into the scanning core from the
//! outside: submit and cancel both land here, whichever surface (TCP,
//! WebSocket, TUI) carried them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;

use crate::context::AppContext;
use crate::core::job::ScanMode;
use crate::core::orchestrator::StartScanError;
use crate::db;

use super::protocol::{Request, Response, SERVER_ERROR};

/// Handles RPC method dispatch and execution.
pub struct MethodHandler {
    ctx: AppContext,
    start_time: Instant,
}

impl MethodHandler {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            start_time: Instant::now(),
        }
    }

    /// Handle an RPC request and return a response.
    pub async fn handle(&self, request: Request) -> Response {
        let id = request.id.clone().unwrap_or(Value::Null);
        let params = request.params.unwrap_or(Value::Null);

        match request.method.as_str() {
            "daemon.status" => self.daemon_status(id).await,
            "scan.submit" => self.scan_submit(id, params).await,
            "scan.cancel" => self.scan_cancel(id).await,
            "scan.active" => self.scan_active(id).await,
            "scans.list" => self.scans_list(id, params).await,
            "scans.get" => self.scans_get(id, params).await,
            _ => Response::method_not_found(id, &request.method),
        }
    }

    /// Get daemon status/health information.
    async fn daemon_status(&self, id: Value) -> Response {
        let active = self.ctx.orchestrator.active().await;
        let uptime_secs = self.start_time.elapsed().as_secs();

        #[derive(Serialize)]
        struct DaemonStatus {
            version: &'static str,
            uptime_secs: u64,
            active_scan: bool,
            job_service_url: String,
            rpc_bind: String,
            simulation: bool,
        }

        Response::success(
            id,
            DaemonStatus {
                version: env!("CARGO_PKG_VERSION"),
                uptime_secs,
                active_scan: active.is_some(),
                job_service_url: self.ctx.config.job_service_url.clone(),
                rpc_bind: self.ctx.config.rpc_bind.to_string(),
                simulation: self.ctx.config.simulation,
            },
        )
    }

    /// Submit a new scan.
    async fn scan_submit(&self, id: Value, params: Value) -> Response {
        #[derive(Deserialize)]
        struct Params {
            target: String,
            mode: String,
        }

        let params: Params = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => return Response::invalid_params(id, e.to_string()),
        };

        let mode: ScanMode = match params.mode.parse() {
            Ok(mode) => mode,
            Err(e) => return Response::invalid_params(id, e),
        };

        match self.ctx.orchestrator.start_scan(&params.target, mode).await {
            Ok(job) => Response::success(id, job),
            Err(err @ StartScanError::InvalidTarget(_)) => {
                Response::invalid_params(id, err.to_string())
            }
            Err(err @ StartScanError::Submit(_)) => {
                Response::error(id, SERVER_ERROR, err.to_string())
            }
        }
    }

    /// Cancel the active scan. Idempotent: an already-terminal scan answers
    /// with its existing status.
    async fn scan_cancel(&self, id: Value) -> Response {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct CancelResult {
            job_id: String,
            status: String,
        }

        match self.ctx.orchestrator.cancel_scan().await {
            Some(job) => Response::success(
                id,
                CancelResult {
                    job_id: job.job_id,
                    status: job.status.as_str().to_string(),
                },
            ),
            None => Response::error(id, SERVER_ERROR, "No scan to cancel"),
        }
    }

    /// Get the scan currently being polled, or null.
    async fn scan_active(&self, id: Value) -> Response {
        Response::success(id, self.ctx.orchestrator.active().await)
    }

    /// List scan history with optional filtering and pagination.
    async fn scans_list(&self, id: Value, params: Value) -> Response {
        #[derive(Deserialize, Default)]
        struct Params {
            #[serde(default)]
            limit: Option<u32>,
            #[serde(default)]
            offset: Option<u32>,
            #[serde(default)]
            status: Option<String>,
            #[serde(default)]
            mode: Option<String>,
        }

        let params: Params = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => return Response::invalid_params(id, e.to_string()),
        };

        let limit = params.limit.unwrap_or(50);
        let offset = params.offset.unwrap_or(0);

        match db::scans::list(&self.ctx.db, limit, offset, params.status, params.mode).await {
            Ok(scans) => Response::success(id, scans),
            Err(e) => Response::internal_error(id, e.to_string()),
        }
    }

    /// Get a single scan with its full status history.
    async fn scans_get(&self, id: Value, params: Value) -> Response {
        #[derive(Deserialize)]
        struct Params {
            id: String,
        }

        let params: Params = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => return Response::invalid_params(id, e.to_string()),
        };

        match db::scans::get_with_history(&self.ctx.db, params.id).await {
            Ok(scan) => Response::success(id, scan),
            Err(e) => Response::internal_error(id, e.to_string()),
        }
    }
}
