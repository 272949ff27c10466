//! Error types for the relay
//!
//! Defines connection-level errors, per-recipient delivery errors and
//! configuration errors. Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Relay errors
///
/// Covers both fatal errors (the owning connection is torn down) and
/// business errors (reported to the sender as text, connection stays up).
#[derive(Debug, Error)]
pub enum RelayError {
    /// IO error on the handler's own connection (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send error (fatal - internal channel broken)
    #[error("Channel send error")]
    ChannelSend,

    /// The relay actor stopped before answering (fatal)
    #[error("Relay server closed")]
    ServerClosed,

    /// The roster already holds this client id (fatal)
    #[error("Client already registered")]
    AlreadyRegistered,

    /// Writing to the handler's own socket took too long (fatal)
    #[error("Write timed out")]
    WriteTimeout,

    /// Destination ordinal does not resolve to a connected client
    #[error("No such client: {0}")]
    NoSuchClient(i64),

    /// Inbound line longer than the configured cap
    #[error("Line too long (max {0} bytes)")]
    LineTooLong(usize),

    /// Destination prefix is not an integer
    #[error("Invalid client id: {0}")]
    InvalidClientId(String),
}

/// Message delivery errors
///
/// Occurs when a message cannot be handed to a recipient's writer.
/// Always scoped to that one recipient.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The recipient's writer has gone away (client disconnecting)
    #[error("Channel closed")]
    ChannelClosed,

    /// The recipient's outbound queue is full (slow reader)
    #[error("Outbound queue full")]
    QueueFull,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable holds a value that cannot be parsed
    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}
