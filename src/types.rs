//! Basic type definitions for the relay
//!
//! Provides newtype wrappers for type safety:
//! - `ClientId`: UUID-based internal client identifier
//! - `AddressingMode`: how clients are numbered on the wire

use std::str::FromStr;

use uuid::Uuid;

/// Unique client identifier (newtype pattern)
///
/// Never shown to clients. Clients address each other by ordinal, which is
/// derived from the roster; this id is what the roster uses to find "self".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub Uuid);

impl ClientId {
    /// Create a new random client ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a client's wire-visible number is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressingMode {
    /// Number = current 1-based position in the roster.
    /// Numbers shift down when an earlier client leaves.
    #[default]
    Positional,
    /// Number = connection sequence number, fixed for the connection's
    /// lifetime and never reused.
    Stable,
}

impl FromStr for AddressingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positional" => Ok(Self::Positional),
            "stable" => Ok(Self::Stable),
            other => Err(other.to_string()),
        }
    }
}
