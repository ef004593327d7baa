//! Web Thing Server
//!
//! Serves the configured things over HTTP and WebSocket.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use webthing::config::ServerConfig;
use webthing::server::{create_router, AppState};
use webthing::things::{build_registry, start_simulations};

/// Web Thing Server
#[derive(Parser, Debug)]
#[command(name = "webthing")]
#[command(about = "Web Thing Server", long_about = None)]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server host address
    #[arg(long)]
    host: Option<String>,

    /// Server port
    #[arg(long)]
    port: Option<u16>,

    /// Records kept per event name
    #[arg(long)]
    event_capacity: Option<usize>,

    /// Messages buffered per WebSocket subscriber
    #[arg(long)]
    subscriber_buffer: Option<usize>,
}

impl Args {
    fn apply(&self, config: &mut ServerConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(capacity) = self.event_capacity {
            config.event_capacity = capacity;
        }
        if let Some(buffer) = self.subscriber_buffer {
            config.subscriber_buffer = buffer;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("webthing=info,thing_runtime=info,tower_http=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting Web Thing server v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path).await?,
        None => ServerConfig::default(),
    };
    args.apply(&mut config);
    config.validate()?;

    let registry = build_registry(&config)?;
    for thing in registry.list() {
        info!("  - {} ({})", thing.id(), thing.type_id());
    }
    let simulations = start_simulations(&registry, config.sensor_interval()?);

    let state = AppState::new(registry, config.subscriber_buffer);
    let app = create_router(state);

    // Start server
    let addr: SocketAddr = config.address().parse()?;
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    for task in simulations {
        task.abort();
    }
    info!("Server shutdown complete");
    Ok(())
}

/// Wait for a shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down...");
        },
    }
}
