//! TCP connection handler
//!
//! Owns one client's lifecycle: registration with the RelayServer, the
//! read-parse-route loop, the single writer task for this socket, and
//! teardown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_util::codec::FramedRead;
use tracing::{debug, error, info, warn};

use crate::codec::{InboundLine, LineCodec};
use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::message::{Command, MalformedReason, ServerMessage};
use crate::router::DeliveryOutcome;
use crate::server::ServerCommand;
use crate::types::ClientId;

/// Spawn a handler task for a freshly accepted connection
pub fn on_client_connected(
    stream: TcpStream,
    addr: SocketAddr,
    cmd_tx: mpsc::Sender<ServerCommand>,
    config: Arc<RelayConfig>,
) {
    tokio::spawn(async move {
        if let Err(e) = handle_connection(stream, addr, cmd_tx, config).await {
            error!("Connection handler error for {}: {}", addr, e);
        }
    });
}

/// Handle a new TCP connection
///
/// Registers the client, serves it until `EXIT`, end of stream or an I/O
/// failure, then removes it from the roster exactly once.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    cmd_tx: mpsc::Sender<ServerCommand>,
    config: Arc<RelayConfig>,
) -> Result<(), RelayError> {
    debug!("New TCP connection from {}", addr);

    let (reader, writer) = stream.into_split();
    let client_id = ClientId::new();

    // Create channel for server -> client messages
    let (msg_tx, msg_rx) = mpsc::channel::<ServerMessage>(config.outbound_buffer);

    // Spawn write task (ServerMessage -> socket)
    let mut write_task = tokio::spawn(write_loop(
        writer,
        msg_rx,
        config.color,
        config.write_timeout,
    ));

    // Register with RelayServer; the roster announcement is queued before the reply
    let (reply, registered) = oneshot::channel();
    cmd_tx
        .send(ServerCommand::Connect {
            client_id,
            addr,
            sender: msg_tx.clone(),
            reply,
        })
        .await
        .map_err(|_| RelayError::ChannelSend)?;
    let number = registered
        .await
        .map_err(|_| RelayError::ServerClosed)?
        .ok_or(RelayError::AlreadyRegistered)?;

    info!("Client {} connected from {} as number {}", client_id, addr, number);

    let mut writer_done = false;
    let result = tokio::select! {
        result = serve_client(client_id, reader, config.max_line_length, &msg_tx, &cmd_tx) => result,
        result = &mut write_task => {
            writer_done = true;
            match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e),
                Err(e) => {
                    error!("Write task for {} panicked: {}", client_id, e);
                    Ok(())
                }
            }
        }
    };

    // Teardown: out of the roster first, then let the writer drain and close
    let (reply, removed) = oneshot::channel();
    if cmd_tx
        .send(ServerCommand::Disconnect { client_id, reply })
        .await
        .is_ok()
    {
        let _ = removed.await;
    }
    drop(msg_tx);

    if !writer_done {
        match write_task.await {
            Ok(Err(e)) => warn!("Final flush to {} failed: {}", addr, e),
            Err(e) => error!("Write task for {} panicked: {}", client_id, e),
            Ok(Ok(())) => {}
        }
    }

    match &result {
        Ok(()) => info!("Client {} ({}) disconnected", client_id, addr),
        Err(e) => warn!("Client {} ({}) dropped: {}", client_id, addr, e),
    }

    result
}

/// Read-parse-route loop; returns on `EXIT` or end of stream
async fn serve_client(
    client_id: ClientId,
    reader: OwnedReadHalf,
    max_line_length: usize,
    msg_tx: &mpsc::Sender<ServerMessage>,
    cmd_tx: &mpsc::Sender<ServerCommand>,
) -> Result<(), RelayError> {
    queue(msg_tx, ServerMessage::Prompt).await?;

    let mut lines = FramedRead::new(reader, LineCodec::new(max_line_length));
    loop {
        let line = match lines.next().await.transpose()? {
            Some(InboundLine::Text(line)) => line,
            Some(InboundLine::TooLong) => {
                warn!("Client {} sent a line over {} bytes", client_id, max_line_length);
                queue(msg_tx, RelayError::LineTooLong(max_line_length).into()).await?;
                queue(msg_tx, ServerMessage::Prompt).await?;
                continue;
            }
            None => {
                debug!("Client {} closed the stream", client_id);
                return Ok(());
            }
        };
        debug!("Client {} sent {:?}", client_id, line);

        match Command::parse(&line) {
            Command::Disconnect => {
                debug!("Client {} sent EXIT", client_id);
                return Ok(());
            }
            Command::Malformed {
                reason: MalformedReason::MissingSeparator,
                ..
            } => {}
            Command::Malformed {
                line,
                reason: MalformedReason::InvalidDestination,
            } => {
                let prefix = Command::destination_prefix(&line).to_string();
                queue(msg_tx, RelayError::InvalidClientId(prefix).into()).await?;
            }
            command => match route(client_id, command, cmd_tx).await? {
                DeliveryOutcome::Delivered { recipients } => {
                    queue(msg_tx, ServerMessage::Sent { recipients }).await?;
                }
                DeliveryOutcome::NoSuchClient(dest) => {
                    queue(msg_tx, RelayError::NoSuchClient(dest).into()).await?;
                }
                DeliveryOutcome::NotRouted => {
                    warn!("Message from {} was not routed", client_id);
                }
            },
        }

        queue(msg_tx, ServerMessage::Prompt).await?;
    }
}

/// Ask the RelayServer to route a command and wait for the outcome
async fn route(
    client_id: ClientId,
    command: Command,
    cmd_tx: &mpsc::Sender<ServerCommand>,
) -> Result<DeliveryOutcome, RelayError> {
    let (reply, outcome) = oneshot::channel();
    cmd_tx
        .send(ServerCommand::Route {
            client_id,
            command,
            reply,
        })
        .await
        .map_err(|_| RelayError::ChannelSend)?;
    outcome.await.map_err(|_| RelayError::ServerClosed)
}

/// Queue a message for this connection's own writer
async fn queue(msg_tx: &mpsc::Sender<ServerMessage>, msg: ServerMessage) -> Result<(), RelayError> {
    msg_tx.send(msg).await.map_err(|_| RelayError::ChannelSend)
}

/// Drain the outbound channel into the socket, then close the write side
async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut msg_rx: mpsc::Receiver<ServerMessage>,
    color: bool,
    limit: Duration,
) -> Result<(), RelayError> {
    while let Some(msg) = msg_rx.recv().await {
        let text = msg.render(color);
        timeout(limit, writer.write_all(text.as_bytes()))
            .await
            .map_err(|_| RelayError::WriteTimeout)??;
    }
    debug!("Write task ended");

    let _ = writer.shutdown().await;
    Ok(())
}
