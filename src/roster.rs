//! Roster of connected clients
//!
//! Ordered by connection time. A client's wire-visible number is either its
//! current 1-based position (positional addressing, numbers shift when an
//! earlier client leaves) or its connection sequence number (stable
//! addressing). The roster itself is not synchronized: it is owned by the
//! relay actor, which serializes every access.

use crate::client::Client;
use crate::message::RosterEntry;
use crate::types::{AddressingMode, ClientId};

/// Ordered collection of live clients
#[derive(Debug)]
pub struct Roster {
    clients: Vec<Client>,
    mode: AddressingMode,
    next_seq: u64,
}

impl Roster {
    /// Create an empty roster using the given addressing mode
    pub fn new(mode: AddressingMode) -> Self {
        Self {
            clients: Vec::new(),
            mode,
            next_seq: 1,
        }
    }

    /// Append a client
    ///
    /// Returns the client's number, or `None` if a client with the same id
    /// is already present (the roster is left untouched).
    pub fn insert(&mut self, mut client: Client) -> Option<u64> {
        if self.contains(client.id) {
            return None;
        }
        let id = client.id;
        client.seq = self.next_seq;
        self.next_seq += 1;
        self.clients.push(client);
        self.number_of(id)
    }

    /// Remove a client, returning it if it was present
    pub fn remove(&mut self, id: ClientId) -> Option<Client> {
        let index = self.clients.iter().position(|c| c.id == id)?;
        Some(self.clients.remove(index))
    }

    /// Check if a client is in the roster
    pub fn contains(&self, id: ClientId) -> bool {
        self.clients.iter().any(|c| c.id == id)
    }

    /// Number of connected clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Check if nobody is connected
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Iterate in connection order
    pub fn iter(&self) -> impl Iterator<Item = &Client> {
        self.clients.iter()
    }

    /// The wire-visible number of a client, as of now
    pub fn number_of(&self, id: ClientId) -> Option<u64> {
        match self.mode {
            AddressingMode::Positional => self
                .clients
                .iter()
                .position(|c| c.id == id)
                .map(|index| index as u64 + 1),
            AddressingMode::Stable => self.clients.iter().find(|c| c.id == id).map(|c| c.seq),
        }
    }

    /// Find the client currently addressed by `dest`
    pub fn resolve(&self, dest: i64) -> Option<&Client> {
        let dest = u64::try_from(dest).ok().filter(|d| *d > 0)?;
        match self.mode {
            AddressingMode::Positional => {
                let index = usize::try_from(dest - 1).ok()?;
                self.clients.get(index)
            }
            AddressingMode::Stable => self.clients.iter().find(|c| c.seq == dest),
        }
    }

    /// Snapshot for a roster announcement
    pub fn entries(&self) -> Vec<RosterEntry> {
        self.clients
            .iter()
            .enumerate()
            .map(|(index, c)| RosterEntry {
                number: match self.mode {
                    AddressingMode::Positional => index as u64 + 1,
                    AddressingMode::Stable => c.seq,
                },
                addr: c.addr.to_string(),
            })
            .collect()
    }
}
