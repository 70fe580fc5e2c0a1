//! Grading relay
//!
//! Edge relay between the browser and the grading backend.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────┐
//!                         │                 GRADING RELAY                 │
//!                         │                                               │
//!   Browser request       │  ┌──────────┐   ┌───────────┐   ┌──────────┐ │
//!   ──────────────────────┼─▶│  server  │──▶│ forwarder │──▶│  hyper   │─┼──▶ Backend
//!   {prefix}/{*path}      │  │ + layers │   │ allowlist │   │  client  │ │    /api/{*path}
//!                         │  └──────────┘   └───────────┘   └────┬─────┘ │
//!                         │                                      │       │
//!   Browser response      │  ┌──────────────────────────────┐    │       │
//!   ◀─────────────────────┼──│ shape: 3xx → 401             │◀───┘       │
//!                         │  │        event-stream → piped  │            │
//!                         │  │        otherwise → buffered  │            │
//!                         │  └──────────────────────────────┘            │
//!                         └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use grading_relay::config::resolve_config;
use grading_relay::lifecycle::signals::spawn_signal_listener;
use grading_relay::observability::{logging, metrics};
use grading_relay::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "grading-relay")]
#[command(about = "Edge relay for the grading backend", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = resolve_config(cli.config.as_deref())?;

    logging::init_logging(&config.observability);

    tracing::info!("grading-relay v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.base_url,
        route_prefix = %config.upstream.route_prefix,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(config);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
