//! Wire protocol
//!
//! Plain newline-delimited text. Clients send `EXIT` or
//! `<destination>/<body>`; the server answers with prompts, relayed
//! messages, acknowledgements, errors and roster announcements.

use crate::error::RelayError;

/// Sentinel destination meaning "everybody but me"
pub const BROADCAST_DESTINATION: i64 = 0;

/// Line that closes the connection
pub const EXIT_COMMAND: &str = "EXIT";

const ANSI_RESET: &str = "\u{1b}[0m";
const ANSI_BLUE: &str = "\u{1b}[34m";
const ANSI_RED: &str = "\u{1b}[31m";
const ANSI_YELLOW: &str = "\u{1b}[33m";

/// Why an input line could not be turned into a routable command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    /// No `/`, or nothing after it. Ignored silently.
    MissingSeparator,
    /// Text before the `/` is not an integer. Reported to the sender.
    InvalidDestination,
}

/// Client → Server command, parsed from one input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `0/<text>`
    Broadcast(String),
    /// `<n>/<text>` with `n != 0`
    DirectMessage(i64, String),
    /// `EXIT`
    Disconnect,
    /// Anything else
    Malformed { line: String, reason: MalformedReason },
}

impl Command {
    /// Parse one line of client input
    pub fn parse(line: &str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);

        if line == EXIT_COMMAND {
            return Command::Disconnect;
        }

        let Some((prefix, body)) = line.split_once('/') else {
            return Command::malformed(line, MalformedReason::MissingSeparator);
        };
        if body.is_empty() {
            return Command::malformed(line, MalformedReason::MissingSeparator);
        }

        match prefix.trim().parse::<i64>() {
            Ok(BROADCAST_DESTINATION) => Command::Broadcast(body.to_string()),
            Ok(dest) => Command::DirectMessage(dest, body.to_string()),
            Err(_) => Command::malformed(line, MalformedReason::InvalidDestination),
        }
    }

    fn malformed(line: &str, reason: MalformedReason) -> Self {
        Command::Malformed {
            line: line.to_string(),
            reason,
        }
    }

    /// The destination prefix of a malformed line, for error reporting
    pub fn destination_prefix(line: &str) -> &str {
        line.split_once('/').map_or(line, |(prefix, _)| prefix)
    }
}

/// One entry of a roster announcement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub number: u64,
    pub addr: String,
}

/// Server → Client message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Usage reminder, sent on connect and after every handled line
    Prompt,
    /// A direct message relayed from another client
    Direct { from: u64, text: String },
    /// Sent to the recipient right after a direct message
    ReplyPrompt,
    /// A broadcast relayed from another client
    Broadcast { from: u64, text: String },
    /// Acknowledgement to the sender
    Sent { recipients: usize },
    /// Error reported to the sender
    Error { message: String },
    /// Snapshot of everyone connected
    Roster { entries: Vec<RosterEntry> },
}

impl ServerMessage {
    /// Render to wire text, newline-terminated
    pub fn render(&self, color: bool) -> String {
        let paint = |code: &str, text: &str| {
            if color {
                format!("{code}{text}{ANSI_RESET}\n")
            } else {
                format!("{text}\n")
            }
        };

        match self {
            ServerMessage::Prompt => paint(
                ANSI_YELLOW,
                "Enter a message (format: clientNumber/message, 0 = broadcast, EXIT = quit):",
            ),
            ServerMessage::Direct { from, text } => {
                paint(ANSI_BLUE, &format!("Message from client {from}: {text}"))
            }
            ServerMessage::ReplyPrompt => paint(ANSI_YELLOW, "You may reply or enter a message:"),
            ServerMessage::Broadcast { from, text } => {
                format!("Broadcast from client {from}: {text}\n")
            }
            ServerMessage::Sent { recipients } => {
                paint(ANSI_YELLOW, &format!("Message sent to {recipients} client(s)."))
            }
            ServerMessage::Error { message } => paint(ANSI_RED, &format!("Error: {message}")),
            ServerMessage::Roster { entries } => {
                let mut block = String::new();
                block.push_str(&paint(ANSI_YELLOW, "===== Connected clients ====="));
                block.push_str(&paint(ANSI_YELLOW, "0/message sends a BROADCAST message"));
                block.push_str(&paint(ANSI_YELLOW, "EXIT closes the connection"));
                for entry in entries {
                    block.push_str(&format!("Client {} ({})\n", entry.number, entry.addr));
                }
                block.push_str(&paint(ANSI_YELLOW, "============================="));
                block
            }
        }
    }
}

/// Convert RelayError to ServerMessage for client notification
impl From<RelayError> for ServerMessage {
    fn from(err: RelayError) -> Self {
        let message = match &err {
            RelayError::NoSuchClient(dest) => {
                format!("client with ID {} does not exist.", dest)
            }
            RelayError::InvalidClientId(raw) => format!("client ID '{}' is invalid.", raw),
            RelayError::LineTooLong(max) => format!("line exceeds {} bytes.", max),
            // Fatal errors are not typically converted (connection closes)
            _ => "internal error".to_string(),
        };
        ServerMessage::Error { message }
    }
}
