//! Line-based TCP Message Relay Library
//!
//! Clients connect over plain TCP and exchange newline-terminated text.
//! Each client is addressed by a number: `2/hello` sends "hello" to client
//! 2, `0/hello` broadcasts to everyone else, `EXIT` disconnects.
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `RelayServer` is the central actor owning the `Roster`
//! - Each connection has a `handler` task that parses lines and asks the
//!   actor to route them, plus a writer task owning the socket's write half
//! - Routing runs inside the actor, so a destination is resolved and
//!   delivered against the same roster
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use relay_server::{serve, RelayConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!     serve(listener, RelayConfig::default()).await;
//! }
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod handler;
pub mod listener;
pub mod message;
pub mod roster;
pub mod router;
pub mod server;
pub mod types;

// Re-export main types for convenience
pub use client::Client;
pub use codec::{InboundLine, LineCodec};
pub use config::RelayConfig;
pub use error::{ConfigError, DeliveryError, RelayError};
pub use handler::{handle_connection, on_client_connected};
pub use listener::serve;
pub use message::{Command, MalformedReason, ServerMessage};
pub use roster::Roster;
pub use router::{route, DeliveryOutcome};
pub use server::{RelayServer, ServerCommand};
pub use types::{AddressingMode, ClientId};
