use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use dockd::config::AppConfig;
use dockd::context::AppContext;
use dockd::core::{JobService, JobStore, Scheduler, SimulatedBackend};
use dockd::logging::{self, LogConfig};
use dockd::web::WebServer;

#[derive(Parser)]
#[command(name = "dockd")]
#[command(about = "Molecular docking job orchestration daemon", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon (scheduler + HTTP API)
    Daemon(ServerArgs),
}

#[derive(Args, Serialize)]
struct ServerArgs {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    http_port: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    max_concurrent_jobs: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    job_timeout_secs: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    verbose: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    json_logs: Option<bool>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Daemon(args) => {
            let config = AppConfig::new(Some(args))?;
            logging::init(LogConfig {
                json: config.json_logs,
                verbose: config.verbose,
            });
            run_daemon(config).await.context("Failed to run daemon")?
        }
    }

    Ok(())
}

async fn run_daemon(config: AppConfig) -> Result<()> {
    let store = JobStore::new();
    let backend = Arc::new(SimulatedBackend::default());
    let scheduler = Scheduler::start(
        store.clone(),
        backend,
        config.max_concurrent_jobs,
        config.job_timeout(),
    );
    let service = JobService::new(store, scheduler.clone());

    let bind_addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let ctx = AppContext::new(config, service);
    let server = Arc::new(WebServer::new(ctx, bind_addr));

    let server_task = {
        let server = server.clone();
        tokio::spawn(async move { server.start().await })
    };

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received");

    server.shutdown();
    // Give in-flight requests a moment, then wait for running jobs.
    let _ = tokio::time::timeout(Duration::from_secs(5), server_task).await;
    scheduler.shutdown().await;

    tracing::info!("Daemon stopped");
    Ok(())
}
