//! Layered application configuration.
//!
//! Sources, lowest to highest precedence: built-in defaults, the managed
//! TOML file, `VSCAND_*` environment variables, then CLI arguments (only
//! the flags actually given, via their serialized form).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

pub const CONFIG_PATH: &str = "/etc/vscand/config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the remote Job Service.
    pub job_service_url: String,
    /// Seconds between progress polls.
    pub poll_interval_secs: u64,
    /// Consecutive poll failures before a warning is logged. Unset means
    /// retry quietly forever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_consecutive_poll_failures: Option<u32>,
    pub rpc_bind: SocketAddr,
    pub http_bind: SocketAddr,
    pub database_path: PathBuf,
    /// Use the in-memory simulated Job Service instead of HTTP.
    pub simulation: bool,
    pub verbose: bool,
    pub log_json: bool,
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub channel: NotificationChannelType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slack_webhook: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannelType {
    #[default]
    None,
    Slack,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            job_service_url: "http://127.0.0.1:9400".to_string(),
            poll_interval_secs: 2,
            max_consecutive_poll_failures: None,
            rpc_bind: "127.0.0.1:7676".parse().unwrap(),
            http_bind: "127.0.0.1:7680".parse().unwrap(),
            database_path: PathBuf::from("vscand.db"),
            simulation: false,
            verbose: false,
            log_json: false,
            notifications: NotificationConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn new<T: Serialize>(cli: Option<&T>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(CONFIG_PATH))
            .merge(Env::prefixed("VSCAND_").split("__"));

        if let Some(cli) = cli {
            figment = figment.merge(Serialized::defaults(cli));
        }

        figment.extract().context("Failed to load configuration")
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = AppConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
        assert!(!config.simulation);
        assert_eq!(config.notifications.channel, NotificationChannelType::None);
    }

    #[test]
    fn poll_interval_has_a_floor() {
        let config = AppConfig {
            poll_interval_secs: 0,
            ..AppConfig::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn cli_overrides_win() {
        #[derive(Serialize)]
        struct Args {
            poll_interval_secs: u64,
        }

        let config = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Serialized::defaults(Args {
                poll_interval_secs: 5,
            }))
            .extract::<AppConfig>()
            .unwrap();
        assert_eq!(config.poll_interval_secs, 5);
    }
}
