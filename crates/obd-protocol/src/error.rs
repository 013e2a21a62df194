//! OBD-II Error Types

use thiserror::Error;

/// Errors that can occur while talking to an ELM327-compatible adapter
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ObdError {
    /// Serial port could not be opened, read or written
    #[error("Serial port error: {0}")]
    SerialError(String),

    /// Timeout waiting for the adapter prompt
    #[error("Timeout waiting for OBD response after {0}ms")]
    Timeout(u64),

    /// The port reached end-of-stream while a reply was expected
    #[error("Adapter closed the connection")]
    Closed,

    /// Reply could not be parsed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Protocol hint not recognised
    #[error("Protocol not supported: {0}")]
    UnsupportedProtocol(String),

    /// Adapter answered `?` to a command
    #[error("Command {0} not supported by adapter")]
    UnsupportedCommand(String),

    /// Payload shorter than the PID formula requires
    #[error("{command}: need {expected} data bytes, got {actual}")]
    ShortPayload {
        command: String,
        expected: usize,
        actual: usize,
    },

    /// Bus-level error reported by the adapter (CAN ERROR, UNABLE TO CONNECT, ...)
    #[error("Bus error: {0}")]
    BusError(String),
}

impl From<std::io::Error> for ObdError {
    fn from(err: std::io::Error) -> Self {
        ObdError::SerialError(err.to_string())
    }
}

impl From<tokio_serial::Error> for ObdError {
    fn from(err: tokio_serial::Error) -> Self {
        ObdError::SerialError(err.to_string())
    }
}
