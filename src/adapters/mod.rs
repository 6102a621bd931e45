use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::job_service::JobService;

mod http;
mod simulated;

pub use http::HttpJobService;
pub use simulated::{ScanScript, SimulatedJobService};

/// Progress added per poll in simulation mode.
const SIMULATED_AUTO_STEP: u8 = 7;

pub fn get_service(config: &AppConfig) -> Arc<dyn JobService> {
    if config.simulation {
        let (service, script) = SimulatedJobService::auto(SIMULATED_AUTO_STEP);

        // Let the operator drive the fake remote side from stdin.
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lines() {
                let Ok(cmd) = line else { break };
                let parts: Vec<&str> = cmd.trim().split_whitespace().collect();
                let Some(job_id) = script.latest_job() else {
                    println!("(Simulator) No job submitted yet");
                    continue;
                };
                match parts.first().copied() {
                    Some("progress") => {
                        let pct = parts.get(1).and_then(|p| p.parse().ok()).unwrap_or(50);
                        script.set_progress(&job_id, pct, None);
                    }
                    Some("complete") => script.complete(&job_id),
                    Some("fail") => script.fail(&job_id, parts.get(1).unwrap_or(&"scan error")),
                    Some("cancel") => script.remote_cancel(&job_id),
                    _ => println!(
                        "(Simulator) Use: 'progress <pct>', 'complete', 'fail <msg>' or 'cancel'"
                    ),
                }
            }
        });

        return Arc::new(service);
    }

    Arc::new(HttpJobService::new(config.job_service_url.clone()))
}
