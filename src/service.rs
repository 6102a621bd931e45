use crate::config::{AppConfig, CONFIG_PATH};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::Command;

const SERVICE_PATH: &str = "/etc/systemd/system/vscand.service";
const CONFIG_DIR: &str = "/etc/vscand";
const DATA_DIR: &str = "/var/lib/vscand";

const SERVICE_TEMPLATE: &str = r#"[Unit]
Description=Vulnerability Scan Orchestration Daemon
After=network-online.target
Wants=network-online.target

[Service]
Type=simple
ExecStart={binary_path} daemon
Restart=always
RestartSec=5

StartLimitBurst=5
StartLimitIntervalSec=60

ProtectSystem=strict
PrivateTmp=true
ReadWritePaths=/var/lib/vscand

[Install]
WantedBy=multi-user.target
"#;

pub struct ServiceManager {
    service_path: PathBuf,
    config_path: PathBuf,
}

impl Default for ServiceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceManager {
    pub fn new() -> Self {
        Self {
            service_path: PathBuf::from(SERVICE_PATH),
            config_path: PathBuf::from(CONFIG_PATH),
        }
    }

    pub fn is_installed(&self) -> bool {
        self.service_path.exists()
    }

    pub fn is_running(&self) -> Result<bool> {
        let output = Command::new("systemctl")
            .args(["is-active", "vscand"])
            .output()
            .context("Failed to check service status")?;

        Ok(output.status.success())
    }

    pub fn load_current_config(&self) -> Result<Option<AppConfig>> {
        if !self.config_path.exists() {
            return Ok(None);
        }

        let content =
            std::fs::read_to_string(&self.config_path).context("Failed to read config file")?;

        let config: AppConfig = toml::from_str(&content).context("Failed to parse config file")?;

        Ok(Some(config))
    }

    pub fn install_and_start(&self, config: &AppConfig) -> Result<()> {
        self.create_directories()?;
        self.write_config(config)?;
        self.write_service_file()?;
        self.daemon_reload()?;
        self.enable()?;
        self.start()?;
        Ok(())
    }

    pub fn update_config_and_restart(&self, config: &AppConfig) -> Result<()> {
        self.write_config(config)?;
        self.write_service_file()?;
        self.daemon_reload()?;
        self.restart()?;
        Ok(())
    }

    pub fn start(&self) -> Result<()> {
        let status = Command::new("systemctl")
            .args(["start", "vscand"])
            .status()
            .context("Failed to start service")?;

        if !status.success() {
            anyhow::bail!("systemctl start vscand failed");
        }
        Ok(())
    }

    fn restart(&self) -> Result<()> {
        let status = Command::new("systemctl")
            .args(["restart", "vscand"])
            .status()
            .context("Failed to restart service")?;

        if !status.success() {
            anyhow::bail!("systemctl restart vscand failed");
        }
        Ok(())
    }

    fn create_directories(&self) -> Result<()> {
        std::fs::create_dir_all(CONFIG_DIR).context("Failed to create /etc/vscand directory")?;
        std::fs::create_dir_all(DATA_DIR).context("Failed to create /var/lib/vscand directory")?;
        Ok(())
    }

    fn write_config(&self, config: &AppConfig) -> Result<()> {
        let content = toml::to_string_pretty(config).context("Failed to serialize config")?;

        std::fs::write(&self.config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    fn write_service_file(&self) -> Result<()> {
        let binary_path = std::env::current_exe().context("Failed to determine binary path")?;

        let service_content =
            SERVICE_TEMPLATE.replace("{binary_path}", &binary_path.display().to_string());

        std::fs::write(&self.service_path, service_content)
            .context("Failed to write service file")?;

        Ok(())
    }

    fn daemon_reload(&self) -> Result<()> {
        let status = Command::new("systemctl")
            .arg("daemon-reload")
            .status()
            .context("Failed to reload systemd")?;

        if !status.success() {
            anyhow::bail!("systemctl daemon-reload failed");
        }
        Ok(())
    }

    fn enable(&self) -> Result<()> {
        let status = Command::new("systemctl")
            .args(["enable", "vscand"])
            .status()
            .context("Failed to enable service")?;

        if !status.success() {
            anyhow::bail!("systemctl enable vscand failed");
        }
        Ok(())
    }
}

pub fn configs_differ(a: &AppConfig, b: &AppConfig) -> bool {
    a.job_service_url != b.job_service_url
        || a.poll_interval_secs != b.poll_interval_secs
        || a.rpc_bind != b.rpc_bind
        || a.http_bind != b.http_bind
        || a.database_path != b.database_path
        || a.simulation != b.simulation
}

pub fn prompt_restart(current: &AppConfig, new: &AppConfig) -> Result<bool> {
    use std::io::{Write, stdin, stdout};

    println!("vscand is already running with a different configuration.\n");
    println!("  Current: {}", current.job_service_url);
    println!("  New:     {}", new.job_service_url);
    println!();
    print!("Restart with new config? [y/N] ");
    stdout().flush()?;

    let mut input = String::new();
    stdin().read_line(&mut input)?;

    Ok(input.trim().eq_ignore_ascii_case("y"))
}
