//! Session Error Types

use obd_protocol::ObdError;
use thiserror::Error;

/// Failures of `connect()`. State is left at `NotConnected` for all of them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConnectionError {
    /// No port configured and discovery found no candidate
    #[error("OBD adapter not found{}", identifier.as_deref().map(|id| format!(" ({id})")).unwrap_or_default())]
    AdapterNotFound { identifier: Option<String> },

    /// Port open, adapter initialization or probe failed
    #[error("Adapter handshake failed: {0}")]
    HandshakeFailed(String),

    /// The port closed in the middle of the handshake
    #[error("Adapter closed the connection unexpectedly")]
    TransportClosedUnexpectedly,
}

/// Failures of a single query
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// No vehicle connection; the transport was not touched
    #[error("Not connected to a vehicle")]
    NotConnected,

    /// Port, timeout or bus fault while running the command
    #[error("Transport fault running {command}")]
    Transport {
        command: String,
        #[source]
        source: ObdError,
    },

    /// Reply did not fit the decode formula
    #[error("Could not decode reply to {command}: {reason}")]
    Decode { command: String, reason: String },

    /// Adapter or ECU does not support the command
    #[error("Command {command} not supported")]
    Unsupported { command: String },
}

/// Configuration load failures
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File or environment source could not be read or deserialized
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// Protocol hint is not a known protocol
    #[error("Invalid protocol hint: {0}")]
    Protocol(#[source] ObdError),
}
