//! Message routing
//!
//! Resolves a parsed command against the roster and hands the relayed
//! messages to the recipients' writers. Runs inside the relay actor, so
//! resolution and delivery see the same roster. Delivery never waits: a
//! recipient whose queue is full misses the message.

use tracing::{debug, warn};

use crate::client::Client;
use crate::message::{Command, ServerMessage};
use crate::roster::Roster;
use crate::types::ClientId;

/// Result of routing one command, reported back to the sender's handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Delivery was attempted to this many recipients (may be 0).
    /// Counts attempts, not successes: a recipient that is full or
    /// disconnecting is still counted.
    Delivered { recipients: usize },
    /// The destination does not resolve to a connected client
    NoSuchClient(i64),
    /// The command is not a message (disconnect, malformed, unknown sender)
    NotRouted,
}

/// Route one command from `sender`
pub fn route(roster: &Roster, sender: ClientId, cmd: Command) -> DeliveryOutcome {
    let Some(from) = roster.number_of(sender) else {
        warn!("Route request from unregistered client {}", sender);
        return DeliveryOutcome::NotRouted;
    };

    match cmd {
        Command::Broadcast(text) => {
            let mut recipients = 0;
            for client in roster.iter().filter(|c| c.id != sender) {
                recipients += 1;
                let msg = ServerMessage::Broadcast {
                    from,
                    text: text.clone(),
                };
                deliver(client, msg);
            }
            debug!("Client {} broadcast to {} client(s)", from, recipients);
            DeliveryOutcome::Delivered { recipients }
        }
        Command::DirectMessage(dest, text) => {
            let Some(recipient) = roster.resolve(dest) else {
                debug!("Client {} addressed missing client {}", from, dest);
                return DeliveryOutcome::NoSuchClient(dest);
            };
            if deliver(recipient, ServerMessage::Direct { from, text }) {
                deliver(recipient, ServerMessage::ReplyPrompt);
            }
            debug!("Client {} sent a direct message to client {}", from, dest);
            DeliveryOutcome::Delivered { recipients: 1 }
        }
        Command::Disconnect | Command::Malformed { .. } => DeliveryOutcome::NotRouted,
    }
}

/// Best-effort delivery to one recipient; failures are logged and dropped
fn deliver(client: &Client, msg: ServerMessage) -> bool {
    match client.send(msg) {
        Ok(()) => true,
        Err(e) => {
            warn!("Delivery to {} ({}) failed: {}", client.id, client.addr, e);
            false
        }
    }
}
