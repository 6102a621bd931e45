use std::sync::Arc;

use tokio_rusqlite::Connection;

use crate::config::AppConfig;
use crate::core::Orchestrator;

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub db: Connection,
    pub orchestrator: Arc<Orchestrator>,
}

impl AppContext {
    pub fn new(config: AppConfig, db: Connection, orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            config: Arc::new(config),
            db,
            orchestrator,
        }
    }
}
