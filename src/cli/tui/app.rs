//! TUI application state and logic.

use std::net::SocketAddr;

use anyhow::Result;
use serde::Deserialize;

use crate::core::job::{ScanJob, ScanMode};
use crate::db::scans::{ScanRow, ScanWithHistory};
use crate::rpc::RpcClient;

/// Response type for the daemon.status RPC call.
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonStatus {
    pub version: String,
    pub uptime_secs: u64,
    pub active_scan: bool,
    pub simulation: bool,
}

/// Cached data fetched from the daemon via RPC.
#[derive(Debug, Default)]
pub struct AppData {
    pub daemon_status: Option<DaemonStatus>,
    pub active_scan: Option<ScanJob>,
    pub recent_scans: Vec<ScanRow>,
    pub all_scans: Vec<ScanRow>,
    pub selected_scan: Option<ScanWithHistory>,
}

/// The new-scan form.
#[derive(Debug, Clone)]
pub struct NewScanForm {
    pub target: String,
    pub mode: ScanMode,
}

impl Default for NewScanForm {
    fn default() -> Self {
        Self {
            target: String::new(),
            mode: ScanMode::Quick,
        }
    }
}

/// Current view being displayed.
#[derive(Debug, Clone)]
pub enum View {
    /// Main dashboard: active scan banner and recent scans list.
    Dashboard {
        /// Selected index in recent scans list
        selected: usize,
    },
    /// Full scan history.
    History {
        /// Selected scan index
        selected: usize,
        /// Pagination offset
        offset: u32,
    },
    /// Single scan detail view.
    Detail {
        /// Scan ID being viewed
        scan_id: String,
        /// Scroll offset for long content
        scroll: u16,
    },
    /// Target/mode form for submitting a scan.
    NewScan(NewScanForm),
}

impl Default for View {
    fn default() -> Self {
        View::Dashboard { selected: 0 }
    }
}

/// Actions that can be triggered by user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Up,
    Down,
    Select,
    Back,
    Refresh,
    History,
    NewScan,
    CancelScan,
    ToggleMode,
    Backspace,
    Input(char),
}

/// Main TUI application state.
pub struct TuiApp {
    client: RpcClient,
    pub view: View,
    pub data: AppData,
    pub running: bool,
    pub error: Option<String>,
}

impl TuiApp {
    /// Create a new TUI application connected to the daemon at the given address.
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            client: RpcClient::new(addr),
            view: View::default(),
            data: AppData::default(),
            running: true,
            error: None,
        }
    }

    /// True while the new-scan form is capturing keystrokes.
    pub fn is_editing(&self) -> bool {
        matches!(self.view, View::NewScan(_))
    }

    /// Fetch initial data from the daemon.
    pub async fn init(&mut self) -> Result<()> {
        self.refresh_dashboard().await
    }

    /// Refresh dashboard data (daemon status, active scan, recent scans).
    pub async fn refresh_dashboard(&mut self) -> Result<()> {
        self.error = None;

        match self
            .client
            .call_no_params::<DaemonStatus>("daemon.status")
            .await
        {
            Ok(status) => self.data.daemon_status = Some(status),
            Err(e) => {
                self.error = Some(format!("Failed to connect: {}", e));
                return Ok(());
            }
        }

        match self
            .client
            .call_no_params::<Option<ScanJob>>("scan.active")
            .await
        {
            Ok(active) => self.data.active_scan = active,
            Err(e) => self.error = Some(format!("Failed to fetch active scan: {}", e)),
        }

        match self
            .client
            .call::<Vec<ScanRow>>("scans.list", Some(serde_json::json!({ "limit": 20 })))
            .await
        {
            Ok(scans) => self.data.recent_scans = scans,
            Err(e) => self.error = Some(format!("Failed to fetch scans: {}", e)),
        }

        Ok(())
    }

    /// Refresh only the active scan (for polling during dashboard view).
    pub async fn refresh_active_scan(&mut self) {
        if let Ok(active) = self
            .client
            .call_no_params::<Option<ScanJob>>("scan.active")
            .await
        {
            // A scan that just went terminal should show up in the list too.
            if active.is_none() && self.data.active_scan.is_some() {
                let _ = self.refresh_dashboard().await;
                return;
            }
            self.data.active_scan = active;
        }
    }

    /// Fetch scans for the history view.
    pub async fn fetch_history(&mut self, offset: u32) {
        match self
            .client
            .call::<Vec<ScanRow>>(
                "scans.list",
                Some(serde_json::json!({ "limit": 50, "offset": offset })),
            )
            .await
        {
            Ok(scans) => self.data.all_scans = scans,
            Err(e) => self.error = Some(format!("Failed to fetch history: {}", e)),
        }
    }

    /// Fetch a single scan's details.
    pub async fn fetch_scan_detail(&mut self, scan_id: &str) {
        match self
            .client
            .call::<ScanWithHistory>("scans.get", Some(serde_json::json!({ "id": scan_id })))
            .await
        {
            Ok(scan) => self.data.selected_scan = Some(scan),
            Err(e) => self.error = Some(format!("Failed to fetch scan: {}", e)),
        }
    }

    /// Submit the new-scan form.
    async fn submit_form(&mut self, form: NewScanForm) {
        let result = self
            .client
            .call::<ScanJob>(
                "scan.submit",
                Some(serde_json::json!({
                    "target": form.target.as_str(),
                    "mode": form.mode.as_str(),
                })),
            )
            .await;

        match result {
            Ok(_) => {
                self.view = View::Dashboard { selected: 0 };
                let _ = self.refresh_dashboard().await;
            }
            Err(e) => {
                // Stay on the form so the target can be fixed.
                self.error = Some(format!("Submit failed: {}", e));
                self.view = View::NewScan(form);
            }
        }
    }

    /// Cancel the active scan.
    async fn cancel_active_scan(&mut self) {
        match self
            .client
            .call_no_params::<serde_json::Value>("scan.cancel")
            .await
        {
            Ok(_) => {
                let _ = self.refresh_dashboard().await;
            }
            Err(e) => self.error = Some(format!("Cancel failed: {}", e)),
        }
    }

    /// Handle an action and update state accordingly.
    pub async fn handle_action(&mut self, action: Action) {
        // Form input is handled per-view first.
        if let View::NewScan(form) = &mut self.view {
            match action {
                Action::Input(c) => {
                    form.target.push(c);
                    return;
                }
                Action::Backspace => {
                    form.target.pop();
                    return;
                }
                Action::ToggleMode => {
                    form.mode = match form.mode {
                        ScanMode::Quick => ScanMode::Full,
                        ScanMode::Full => ScanMode::Quick,
                    };
                    return;
                }
                Action::Select => {
                    let form = form.clone();
                    self.submit_form(form).await;
                    return;
                }
                Action::Back => {
                    self.view = View::Dashboard { selected: 0 };
                    return;
                }
                Action::Quit => {
                    self.running = false;
                    return;
                }
                _ => return,
            }
        }

        match action {
            Action::Quit => self.running = false,
            Action::Refresh => {
                let _ = self.refresh_dashboard().await;
            }
            Action::NewScan => {
                self.error = None;
                self.view = View::NewScan(NewScanForm::default());
            }
            Action::CancelScan => self.cancel_active_scan().await,
            Action::History => {
                self.fetch_history(0).await;
                self.view = View::History {
                    selected: 0,
                    offset: 0,
                };
            }
            Action::Back => {
                self.view = View::Dashboard { selected: 0 };
                let _ = self.refresh_dashboard().await;
            }
            Action::Up => self.navigate_up(),
            Action::Down => self.navigate_down(),
            Action::Select => self.select_item().await,
            Action::ToggleMode | Action::Backspace | Action::Input(_) => {}
        }
    }

    fn navigate_up(&mut self) {
        match &self.view {
            View::Dashboard { selected } => {
                if *selected > 0 {
                    self.view = View::Dashboard {
                        selected: *selected - 1,
                    };
                }
            }
            View::History { selected, offset } => {
                if *selected > 0 {
                    self.view = View::History {
                        selected: *selected - 1,
                        offset: *offset,
                    };
                }
            }
            View::Detail { scan_id, scroll } => {
                self.view = View::Detail {
                    scan_id: scan_id.clone(),
                    scroll: scroll.saturating_sub(1),
                };
            }
            View::NewScan(_) => {}
        }
    }

    fn navigate_down(&mut self) {
        match &self.view {
            View::Dashboard { selected } => {
                if *selected + 1 < self.data.recent_scans.len() {
                    self.view = View::Dashboard {
                        selected: *selected + 1,
                    };
                }
            }
            View::History { selected, offset } => {
                if *selected + 1 < self.data.all_scans.len() {
                    self.view = View::History {
                        selected: *selected + 1,
                        offset: *offset,
                    };
                }
            }
            View::Detail { scan_id, scroll } => {
                self.view = View::Detail {
                    scan_id: scan_id.clone(),
                    scroll: *scroll + 1,
                };
            }
            View::NewScan(_) => {}
        }
    }

    async fn select_item(&mut self) {
        let scan_id = match &self.view {
            View::Dashboard { selected } => self
                .data
                .recent_scans
                .get(*selected)
                .map(|scan| scan.id.clone()),
            View::History { selected, .. } => self
                .data
                .all_scans
                .get(*selected)
                .map(|scan| scan.id.clone()),
            View::Detail { .. } | View::NewScan(_) => None,
        };

        if let Some(id) = scan_id {
            self.fetch_scan_detail(&id).await;
            self.view = View::Detail {
                scan_id: id,
                scroll: 0,
            };
        }
    }
}
