//! RelayServer Actor implementation
//!
//! The central actor that owns the roster. Every roster read and write goes
//! through its command channel, so connects, disconnects and routing never
//! observe a half-updated roster.

use std::net::SocketAddr;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::client::Client;
use crate::config::RelayConfig;
use crate::message::{Command, ServerMessage};
use crate::roster::Roster;
use crate::router::{self, DeliveryOutcome};
use crate::types::ClientId;

/// Commands sent from handlers to the RelayServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// New client connected; replies with its number once announced
    Connect {
        client_id: ClientId,
        addr: SocketAddr,
        sender: mpsc::Sender<ServerMessage>,
        reply: oneshot::Sender<Option<u64>>,
    },
    /// Client is going away; replies once it is out of the roster
    Disconnect {
        client_id: ClientId,
        reply: oneshot::Sender<()>,
    },
    /// Relay a parsed message
    Route {
        client_id: ClientId,
        command: Command,
        reply: oneshot::Sender<DeliveryOutcome>,
    },
}

/// The main RelayServer actor
pub struct RelayServer {
    /// Connected clients in connection order
    roster: Roster,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
}

impl RelayServer {
    /// Create a new RelayServer with the given command receiver
    pub fn new(receiver: mpsc::Receiver<ServerCommand>, config: &RelayConfig) -> Self {
        Self {
            roster: Roster::new(config.addressing),
            receiver,
        }
    }

    /// Run the RelayServer event loop
    ///
    /// Continuously receives and processes commands until all senders are dropped.
    pub async fn run(mut self) {
        info!("RelayServer started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("RelayServer shutting down");
    }

    /// Process a single command
    fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Connect {
                client_id,
                addr,
                sender,
                reply,
            } => {
                let number = self.handle_connect(client_id, addr, sender);
                let _ = reply.send(number);
            }
            ServerCommand::Disconnect { client_id, reply } => {
                self.handle_disconnect(client_id);
                let _ = reply.send(());
            }
            ServerCommand::Route {
                client_id,
                command,
                reply,
            } => {
                let outcome = router::route(&self.roster, client_id, command);
                let _ = reply.send(outcome);
            }
        }
    }

    /// Handle new client connection
    fn handle_connect(
        &mut self,
        client_id: ClientId,
        addr: SocketAddr,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Option<u64> {
        let Some(number) = self.roster.insert(Client::new(client_id, addr, sender)) else {
            warn!("Client {} is already registered", client_id);
            return None;
        };

        info!("Client {} ({}) registered as number {}", client_id, addr, number);
        debug!("Total clients: {}", self.roster.len());

        self.announce_roster();
        Some(number)
    }

    /// Handle client disconnection
    fn handle_disconnect(&mut self, client_id: ClientId) {
        let Some(client) = self.roster.remove(client_id) else {
            return;
        };

        info!("Client {} ({}) left the roster", client_id, client.addr);
        debug!("Total clients: {}", self.roster.len());

        // Drop our handle on its writer before telling the others
        drop(client);

        if !self.roster.is_empty() {
            self.announce_roster();
        }
    }

    /// Send the current roster to every client, the newcomer included
    fn announce_roster(&self) {
        let msg = ServerMessage::Roster {
            entries: self.roster.entries(),
        };

        for client in self.roster.iter() {
            if let Err(e) = client.send(msg.clone()) {
                warn!("Roster announcement to {} failed: {}", client.id, e);
            }
        }
    }
}
