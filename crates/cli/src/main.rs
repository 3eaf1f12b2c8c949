//! rvoip-bridge: interactive bridge orchestration against an ARI server

mod config;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use rvoip_ari_client::{AriClient, ControlPlane};
use rvoip_bridge_core::{BridgeOrchestrator, Command, CommandSurface, EventReactor, USAGE};

use crate::config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "rvoip-bridge")]
#[command(about = "Bridge extensions into calls and conferences over Asterisk ARI", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file (default: <config dir>/rvoip-bridge/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// ARI host
    #[arg(long, env = "ARI_HOST")]
    pub host: Option<String>,

    /// ARI HTTP port
    #[arg(long, env = "ARI_PORT")]
    pub port: Option<u16>,

    /// ARI user
    #[arg(short, long, env = "ARI_USERNAME")]
    pub username: Option<String>,

    /// ARI password
    #[arg(short, long, env = "ARI_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Stasis application name
    #[arg(long, env = "ARI_APP")]
    pub app: Option<String>,

    /// Use https and wss
    #[arg(long)]
    pub secure: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_cli(&cli);
    logging::setup_logging(&config.logging)?;
    config.validate()?;

    info!("Starting rvoip-bridge v{}", env!("CARGO_PKG_VERSION"));

    let client = AriClient::new(config.ari.clone()).context("Failed to create ARI client")?;
    client
        .check_connection()
        .await
        .with_context(|| format!("ARI server at {} is not reachable", client.config().base_url()))?;

    let control: Arc<dyn ControlPlane> = Arc::new(client);
    let orchestrator = Arc::new(BridgeOrchestrator::new(
        control.clone(),
        config.orchestrator.clone(),
    ));

    let events = control
        .subscribe_events()
        .await
        .context("Failed to subscribe to ARI events")?;
    let reactor = EventReactor::new(control, orchestrator.registry()).spawn(events);

    let surface = CommandSurface::new(orchestrator);
    println!("{}", USAGE);
    run_repl(&surface, &reactor).await?;

    reactor.abort();
    info!("Shutting down");
    Ok(())
}

/// Read commands from stdin until `exit`, end of input or Ctrl-C
async fn run_repl(surface: &CommandSurface, reactor: &JoinHandle<()>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut reactor_reported = false;

    loop {
        if !reactor_reported && reactor.is_finished() {
            eprintln!("Warning: ARI event stream closed; bridges will no longer be cleaned up");
            reactor_reported = true;
        }
        print!("> ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };
        let Some(line) = line else {
            break;
        };

        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("Error: {}", e);
                continue;
            }
        };
        if command == Command::Exit {
            break;
        }

        match surface.execute(command).await {
            Ok(message) => println!("{}", message),
            Err(e) => {
                warn!("Command failed: {}", e);
                eprintln!("Error: {}", e);
            }
        }
    }

    Ok(())
}
