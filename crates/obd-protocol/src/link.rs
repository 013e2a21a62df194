//! Adapter link abstraction.
//!
//! `AdapterDriver` discovers ports and opens links; `AdapterLink` is one open,
//! initialized adapter. Two impls:
//! - `SerialDriver`/`ObdClient`: ELM327 over a serial or RFCOMM device
//! - `MockDriver`/`MockLink`: scripted replies (in `mock.rs`)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ObdError;
use crate::pid::Pid;
use crate::protocol::ObdProtocol;

/// Status reported by the adapter after initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterStatus {
    /// The device did not identify as an ELM327
    NotConnected,
    /// Adapter answers but no ECU replied to the probe
    ElmConnected,
    /// ECU answered the supported-PIDs probe
    CarConnected,
}

/// Parameters for opening a link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSettings {
    /// Serial device path (e.g. "/dev/rfcomm0", "/dev/ttyUSB0" or "COM3")
    pub port: String,
    /// Protocol forced with `ATSPn`, or `Auto`
    pub protocol: ObdProtocol,
    /// How long to wait for the `>` prompt after each command
    pub command_timeout: Duration,
}

/// One open adapter. Commands are strictly request/response.
#[async_trait]
pub trait AdapterLink: Send {
    /// Device path this link was opened on
    fn port(&self) -> &str;

    /// Version banner returned by `ATZ`, `None` if the device is not an ELM327
    fn adapter_version(&self) -> Option<&str>;

    /// Send one OBD command (e.g. `010C`) and wait for its reply.
    ///
    /// `Ok(None)` means the adapter answered `NO DATA`.
    async fn send(&mut self, command: &str) -> Result<Option<Vec<u8>>, ObdError>;

    /// Close the adapter session. The underlying handle is released on drop
    /// whether or not this succeeds.
    async fn close(&mut self) -> Result<(), ObdError>;
}

/// Opens links and discovers candidate ports.
#[async_trait]
pub trait AdapterDriver: Send + Sync {
    /// Candidate adapter ports, most likely first
    fn discover_ports(&self) -> Vec<String>;

    /// Open and initialize a link on `settings.port`
    async fn open(&self, settings: &LinkSettings) -> Result<Box<dyn AdapterLink>, ObdError>;
}

/// Determine the adapter status of a freshly opened link.
///
/// Faults that show the adapter is alive but the ECU is not (bus errors,
/// `NO DATA`, `?`, no answer in time) map to `ElmConnected`; port faults are
/// returned.
pub async fn probe(link: &mut dyn AdapterLink) -> Result<AdapterStatus, ObdError> {
    if link.adapter_version().is_none() {
        return Ok(AdapterStatus::NotConnected);
    }

    match link.send(&Pid::SupportedPids.command()).await {
        Ok(Some(_)) => Ok(AdapterStatus::CarConnected),
        Ok(None) => Ok(AdapterStatus::ElmConnected),
        Err(
            ObdError::BusError(_)
            | ObdError::Timeout(_)
            | ObdError::UnsupportedCommand(_)
            | ObdError::InvalidResponse(_)
            | ObdError::ShortPayload { .. },
        ) => Ok(AdapterStatus::ElmConnected),
        Err(e) => Err(e),
    }
}
