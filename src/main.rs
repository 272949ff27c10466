//! Line relay server - Entry Point
//!
//! Loads the configuration, binds the TCP listener and serves clients.

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use relay_server::{serve, RelayConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=relay_server=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("relay_server=info")),
        )
        .init();

    // RELAY_* env vars, then the first argument as bind address
    let config = RelayConfig::from_env()?;

    let listener = TcpListener::bind(&config.addr).await?;
    info!(
        "Relay server listening on {} ({:?} addressing)",
        config.addr, config.addressing
    );

    serve(listener, config).await;
    Ok(())
}
