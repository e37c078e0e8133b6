//! Strangler-fig migration gateway.
//!
//! Fronts the legacy monolith and the new movies service with one stable
//! API and shifts `/api/movies` traffic between them.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────┐
//!                         │                    GATEWAY                       │
//!     Client Request      │  ┌─────────┐    ┌──────────┐    ┌────────────┐   │
//!     ────────────────────┼─▶│  http   │───▶│ routing  │───▶│  forward   │───┼──▶ monolith
//!                         │  │ server  │    │ selector │    │ (reqwest)  │   │    or movies
//!                         │  └─────────┘    └──────────┘    └─────┬──────┘   │
//!     Client Response     │                                      ▼           │
//!     ◀───────────────────┼──────────── response (+ X-Target-Service)        │
//!                         │                                                  │
//!                         │  config · observability · lifecycle              │
//!                         └──────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use strangler_gateway::config::load_config;
use strangler_gateway::http::HttpServer;
use strangler_gateway::lifecycle::{signals, Shutdown};
use strangler_gateway::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "strangler-gateway")]
#[command(about = "Routes /api/movies between the monolith and the movies service", long_about = None)]
struct Cli {
    /// Optional TOML file; environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("strangler-gateway: invalid configuration: {e}");
            std::process::exit(2);
        }
    };

    logging::init(&config.observability);

    tracing::info!("strangler-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address(),
        monolith_url = %config.migration.monolith_url,
        movies_service_url = %config.migration.movies_service_url,
        gradual_migration = config.migration.gradual_migration,
        movies_migration_percent = config.migration.movies_migration_percent,
        connect_timeout_secs = config.timeouts.connect_secs,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let configured = config.migration.movies_migration_percent;
    if !(0..=100).contains(&configured) {
        tracing::warn!(
            configured,
            effective = config.migration.effective_percent(),
            "MOVIES_MIGRATION_PERCENT outside 0..=100, clamping"
        );
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(config.listener.bind_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(&shutdown);

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
