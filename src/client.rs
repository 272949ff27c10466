//! Client struct definition
//!
//! Represents a connected peer as seen by the roster: its identity, its
//! remote address and the channel feeding its writer task.

use std::net::SocketAddr;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::DeliveryError;
use crate::message::ServerMessage;
use crate::types::ClientId;

/// Connected client information
#[derive(Debug)]
pub struct Client {
    /// Unique identifier for this client
    pub id: ClientId,
    /// Remote address, for display in roster announcements
    pub addr: SocketAddr,
    /// Connection sequence number (1-based), assigned by the roster
    pub seq: u64,
    /// Server → Client message channel
    pub sender: mpsc::Sender<ServerMessage>,
}

impl Client {
    /// Create a new client; `seq` is filled in when it joins a roster
    pub fn new(id: ClientId, addr: SocketAddr, sender: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            id,
            addr,
            seq: 0,
            sender,
        }
    }

    /// Queue a message for this client's writer without waiting
    ///
    /// A full queue means the client is not keeping up; the message is
    /// dropped rather than holding up the caller.
    pub fn send(&self, msg: ServerMessage) -> Result<(), DeliveryError> {
        self.sender.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::QueueFull,
            TrySendError::Closed(_) => DeliveryError::ChannelClosed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> SocketAddr {
        "127.0.0.1:4000".parse().unwrap()
    }

    #[tokio::test]
    async fn test_client_send() {
        let (tx, mut rx) = mpsc::channel(4);
        let client = Client::new(ClientId::new(), addr(), tx);

        client.send(ServerMessage::Prompt).unwrap();
        assert_eq!(rx.recv().await, Some(ServerMessage::Prompt));
    }

    #[test]
    fn test_client_send_closed() {
        let (tx, rx) = mpsc::channel(4);
        let client = Client::new(ClientId::new(), addr(), tx);
        drop(rx);

        let result = client.send(ServerMessage::Prompt);
        assert!(matches!(result, Err(DeliveryError::ChannelClosed)));
    }

    #[test]
    fn test_client_send_full_queue_drops() {
        let (tx, mut rx) = mpsc::channel(1);
        let client = Client::new(ClientId::new(), addr(), tx);

        client.send(ServerMessage::Prompt).unwrap();
        let result = client.send(ServerMessage::ReplyPrompt);
        assert!(matches!(result, Err(DeliveryError::QueueFull)));

        // Only the first message made it
        assert_eq!(rx.try_recv().ok(), Some(ServerMessage::Prompt));
        assert!(rx.try_recv().is_err());
    }
}
