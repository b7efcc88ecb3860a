//! Catalog API gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client Request
//!     │
//!     ▼
//!   request id → trace → timeout
//!     │
//!     ▼
//!   RateLimiter ──429──▶ (Retry-After)
//!     │
//!     ▼
//!   CORS ──preflight──▶ 204 / 403
//!     │
//!     ▼
//!   body decode ──400/413──▶
//!     │
//!     ▼
//!   Dispatcher ──no route──▶ 404 {"error":"Invalid endpoint. Not found."}
//!     │  protected route?
//!     ▼
//!   AuthGate ──401──▶ (revocation list, then signature and expiry)
//!     │
//!     ▼
//!   Resource handler (DocumentStore)
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use catalog_gateway::config::load_config;
use catalog_gateway::http::HttpServer;
use catalog_gateway::lifecycle::{shutdown_signal, Shutdown};
use catalog_gateway::observability::{logging, metrics};
use catalog_gateway::store::{InMemoryDocumentStore, InMemoryRevocationStore};

#[derive(Parser, Debug)]
#[command(name = "catalog-gateway", version, about = "Catalog API gateway")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen port, overriding the file and PORT
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    dotenvy::dotenv().ok();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.listener.port = port;
    }

    logging::init_logging(&config.observability);
    tracing::info!("catalog-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address(),
        window_secs = config.rate_limit.window_secs,
        max_requests = config.rate_limit.max_requests,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

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
    let server = HttpServer::new(
        config,
        Arc::new(InMemoryRevocationStore::new()),
        Arc::new(InMemoryDocumentStore::new()),
    );
    let server_rx = shutdown.subscribe();

    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.trigger();
    });

    server.run(listener, server_rx).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
