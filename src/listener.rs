//! Accept loop
//!
//! Starts the RelayServer actor and hands every accepted socket to a
//! handler task.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::config::RelayConfig;
use crate::handler::on_client_connected;
use crate::server::RelayServer;

/// Serve connections from `listener` forever
///
/// Accept errors are logged and the loop carries on.
pub async fn serve(listener: TcpListener, config: RelayConfig) {
    let config = Arc::new(config);

    // Create RelayServer actor channel and start
    let (cmd_tx, cmd_rx) = mpsc::channel(config.command_buffer);
    tokio::spawn(RelayServer::new(cmd_rx, &config).run());

    info!("RelayServer actor started");

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("New connection from {}", addr);
                on_client_connected(stream, addr, cmd_tx.clone(), Arc::clone(&config));
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
