use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use vscand::core::{Orchestrator, OrchestratorSettings, notifications};
use vscand::{adapters, cli, config, context, db, logging, rpc, service, web};

#[derive(Parser)]
#[command(name = "vscand")]
#[command(about = "Vulnerability Scan Orchestration Daemon", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    simulation: Option<bool>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon: scan orchestrator, RPC server, and web dashboard
    Daemon(ServerArgs),
    /// Interactive terminal dashboard
    Tui,
    /// One-shot status query against a running daemon
    Status,
    /// Install and start the systemd service
    Install(ServerArgs),
}

#[derive(Args, Serialize)]
struct ServerArgs {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    job_service_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    poll_interval_secs: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    rpc_bind: Option<SocketAddr>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    http_bind: Option<SocketAddr>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    database_path: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    verbose: Option<bool>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.command {
        Commands::Daemon(args) | Commands::Install(args) => {
            config::AppConfig::new(Some(args))?
        }
        _ => config::AppConfig::new(None::<&ServerArgs>)?,
    };
    if let Some(simulation) = cli.simulation {
        config.simulation = simulation;
    }

    match &cli.command {
        Commands::Daemon(_) => {
            logging::init(logging::LogConfig {
                json: config.log_json,
                verbose: config.verbose,
            });

            let db_conn = db::init(&config.database_path).await?;
            let service = adapters::get_service(&config);
            let orchestrator = Arc::new(Orchestrator::new(
                service,
                OrchestratorSettings {
                    poll_interval: config.poll_interval(),
                    max_consecutive_poll_failures: config.max_consecutive_poll_failures,
                },
            ));
            let ctx = context::AppContext::new(config, db_conn, orchestrator);
            run_daemon(ctx).await.context("Failed to start daemon")?
        }
        Commands::Tui => cli::tui::run(config.rpc_bind).await?,
        Commands::Status => run_status(&config).await?,
        Commands::Install(_) => run_install(&config)?,
    }

    Ok(())
}

async fn run_daemon(ctx: context::AppContext) -> Result<()> {
    // Mirror every accepted transition into the history tables.
    tokio::spawn(db::scans::record_stream(
        ctx.db.clone(),
        ctx.orchestrator.subscribe(),
    ));

    if let Some(notifier) = notifications::create_notifier(&ctx.config.notifications) {
        tokio::spawn(notifications::run(notifier, ctx.orchestrator.subscribe()));
    }

    let rpc_server = rpc::RpcServer::new(ctx.clone(), ctx.config.rpc_bind);
    let web_server = web::WebServer::new(ctx.clone(), ctx.config.http_bind);

    tokio::select! {
        result = rpc_server.start() => result.context("RPC server failed")?,
        result = web_server.start() => result.context("Web server failed")?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
            rpc_server.shutdown();
            web_server.shutdown();
        }
    }

    Ok(())
}

async fn run_status(config: &config::AppConfig) -> Result<()> {
    let client = rpc::RpcClient::new(config.rpc_bind);
    let status: serde_json::Value = client
        .call_no_params("daemon.status")
        .await
        .context("Is the daemon running?")?;

    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

fn run_install(config: &config::AppConfig) -> Result<()> {
    let manager = service::ServiceManager::new();

    if manager.is_installed() && manager.is_running()? {
        if let Some(current) = manager.load_current_config()? {
            if service::configs_differ(&current, config) {
                if service::prompt_restart(&current, config)? {
                    manager.update_config_and_restart(config)?;
                    println!("vscand restarted with new configuration");
                }
                return Ok(());
            }
        }
        println!("vscand is already installed and running");
        return Ok(());
    }

    manager.install_and_start(config)?;
    println!("vscand installed and started");
    Ok(())
}
