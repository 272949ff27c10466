//! Relay configuration
//!
//! Defaults, overridable from `RELAY_*` environment variables. The bind
//! address can additionally be given as the first command line argument.

use std::env;
use std::time::Duration;

use crate::codec::DEFAULT_MAX_LINE_LENGTH;
use crate::error::ConfigError;
use crate::types::AddressingMode;

/// Default server address
pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Runtime settings shared by the accept loop, the actor and every handler
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address to bind the listener to
    pub addr: String,
    /// Upper bound for one write to a client socket
    pub write_timeout: Duration,
    /// Longest accepted inbound line, in bytes
    pub max_line_length: usize,
    /// Positional (shifting) or stable client numbers
    pub addressing: AddressingMode,
    /// Wrap server text in ANSI colors
    pub color: bool,
    /// Buffer size of the handler → actor command channel
    pub command_buffer: usize,
    /// Buffer size of each client's outbound message channel
    pub outbound_buffer: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            write_timeout: Duration::from_secs(5),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            addressing: AddressingMode::Positional,
            color: true,
            command_buffer: 256,
            outbound_buffer: 32,
        }
    }
}

impl RelayConfig {
    /// Build the configuration from the process environment and arguments
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::from_lookup(|name| env::var(name).ok())?;
        if let Some(addr) = env::args().nth(1) {
            config.addr = addr;
        }
        Ok(config)
    }

    /// Build the configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("RELAY_ADDR") {
            config.addr = addr;
        }
        if let Some(ms) = lookup("RELAY_WRITE_TIMEOUT_MS") {
            config.write_timeout = parse_millis("RELAY_WRITE_TIMEOUT_MS", ms)?;
        }
        if let Some(len) = lookup("RELAY_MAX_LINE_LENGTH") {
            config.max_line_length = match len.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "RELAY_MAX_LINE_LENGTH",
                        value: len,
                    })
                }
            };
        }
        if let Some(mode) = lookup("RELAY_ADDRESSING") {
            config.addressing = mode.parse().map_err(|_| ConfigError::InvalidValue {
                name: "RELAY_ADDRESSING",
                value: mode.clone(),
            })?;
        }
        if let Some(flag) = lookup("RELAY_COLOR") {
            config.color = match flag.trim() {
                "1" | "true" | "on" => true,
                "0" | "false" | "off" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "RELAY_COLOR",
                        value: flag,
                    })
                }
            };
        }

        Ok(config)
    }
}

fn parse_millis(name: &'static str, value: String) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        _ => Err(ConfigError::InvalidValue { name, value }),
    }
}
