//! Passoul relay client.
//!
//! # Architecture Overview
//!
//! ```text
//!   Remote controller          ┌──────────────────────── PASSOUL ─────────────────────────┐
//!         │                    │                                                          │
//!         ▼                    │  ┌──────────┐   ┌──────────────┐   ┌──────────┐          │
//!   Rendezvous server ◀════════┼═▶│ channel  │──▶│ orchestrator │──▶│   body   │          │
//!    (public)         WebSocket│  │ (ws/mem) │   │  + sessions  │   │ + call   │          │
//!                              │  └──────────┘   └──────┬───────┘   └────┬─────┘          │
//!                              │        ▲               │                ▼                │
//!                              │        │         ┌─────┴─────┐    ┌──────────┐           │
//!                              │        └─────────│  decoder  │◀───│ outbound │◀──────────┼──▶ Local target
//!                              │    envelope      └───────────┘    │ (reqwest)│           │    (private)
//!                              │                                   └──────────┘           │
//!                              └──────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{ArgAction, Parser};

use passoul::config::{load_config, ConnectionOptions, RelayConfig};
use passoul::observability::{logging, metrics};
use passoul::RelayClient;

#[derive(Parser, Debug)]
#[command(name = "passoul")]
#[command(about = "Expose a local HTTP service through a rendezvous server", long_about = None)]
#[command(disable_help_flag = true, disable_version_flag = true)]
struct Cli {
    /// Rendezvous server URL
    #[arg(short, long)]
    server: Option<String>,

    /// Local href for your service
    #[arg(short = 'h', long)]
    href: Option<String>,

    /// Local port for your service
    #[arg(short, long)]
    port: Option<u16>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Display version
    #[arg(short = 'v', long)]
    version: bool,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

impl Cli {
    /// Command-line connection flags override the config file.
    fn apply(&self, options: &mut ConnectionOptions) {
        if let Some(server) = &self.server {
            options.server = Some(server.clone());
        }
        if let Some(href) = &self.href {
            options.href = Some(href.clone());
        }
        if let Some(port) = self.port {
            options.port = Some(port);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.version {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return;
    }

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RelayConfig::default(),
    };
    cli.apply(&mut config.connection);

    logging::init_logging(&config.observability);
    tracing::info!("passoul v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let client = RelayClient::from_config(&config)?;
    let connection = client.create(&config.connection)?.await?;

    match client.session(&connection).and_then(|s| s.public_url()) {
        Some(url) => println!("{}", url),
        None => tracing::warn!(connection = %connection.id(), "Session carries no hostname"),
    }

    tokio::select! {
        _ = connection.closed() => tracing::info!("Connection closed"),
        _ = shutdown_signal() => {}
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await
        }
    }
}
