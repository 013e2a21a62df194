//! OBD-II Client for ELM327 Adapters
//!
//! Provides async serial communication with OBD-II adapters. Bluetooth
//! adapters are reached through a bound RFCOMM device (`/dev/rfcommN`).

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_serial::{ClearBuffer, SerialPort, SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, warn};

use crate::elm::{self, Request};
use crate::error::ObdError;
use crate::link::{AdapterDriver, AdapterLink, LinkSettings};
use crate::protocol::ObdProtocol;
use crate::scan;

/// Default timeout for OBD commands. The first query after `ATSP0` may
/// spend several seconds in `SEARCHING...`.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_millis(10_000);

/// How long to wait for the prompt of a command that already timed out
pub const RESYNC_TIMEOUT: Duration = Duration::from_millis(1_000);

/// Upper bound on the `ATPC` exchange when closing
pub const CLOSE_TIMEOUT: Duration = Duration::from_millis(500);

/// Initialization commands sent after `ATZ`: echo, linefeeds, spaces and
/// headers off.
const INIT_COMMANDS: [&str; 4] = ["ATE0", "ATL0", "ATS0", "ATH0"];

/// Byte stream to an adapter
pub trait AdapterStream: AsyncRead + AsyncWrite + Unpin + Send {
    /// Drop input already received but not yet read
    fn discard_input(&mut self) -> Result<(), ObdError> {
        Ok(())
    }
}

impl AdapterStream for SerialStream {
    fn discard_input(&mut self) -> Result<(), ObdError> {
        self.clear(ClearBuffer::Input)?;
        Ok(())
    }
}

/// OBD-II client for communicating with ELM327-compatible adapters
pub struct ObdClient<S = SerialStream> {
    /// Serial port device path (e.g., "/dev/ttyUSB0" or "COM3")
    device: String,
    /// OBD protocol to use
    protocol: ObdProtocol,
    /// Command timeout
    timeout: Duration,
    /// Open port; closed when the client is dropped
    stream: S,
    /// Banner returned by `ATZ`
    version: Option<String>,
    /// A command timed out and its prompt has not been read yet
    stale: bool,
}

impl ObdClient<SerialStream> {
    /// Open the serial device and initialize the ELM327 adapter
    pub async fn open(settings: &LinkSettings) -> Result<Self, ObdError> {
        let baud_rate = settings.protocol.default_baud_rate();
        info!(
            device = %settings.port,
            baud_rate,
            protocol = %settings.protocol,
            "Opening OBD adapter"
        );

        let stream = tokio_serial::new(settings.port.as_str(), baud_rate)
            .timeout(settings.command_timeout)
            .open_native_async()?;
        Self::with_stream(stream, settings).await
    }
}

impl<S: AdapterStream> ObdClient<S> {
    /// Initialize the ELM327 adapter on an already open stream
    pub async fn with_stream(stream: S, settings: &LinkSettings) -> Result<Self, ObdError> {
        let mut client = Self {
            device: settings.port.clone(),
            protocol: settings.protocol,
            timeout: settings.command_timeout,
            stream,
            version: None,
            stale: false,
        };
        client.initialize().await?;
        Ok(client)
    }

    /// Reset the adapter and apply the protocol selection
    async fn initialize(&mut self) -> Result<(), ObdError> {
        let banner = self.exchange("ATZ").await?;
        self.version = elm::clean_lines(&banner)
            .into_iter()
            .find(|line| line.to_ascii_uppercase().contains("ELM"));

        match &self.version {
            Some(version) => info!(device = %self.device, %version, "Adapter identified"),
            None => {
                warn!(device = %self.device, "Device did not identify as an ELM327");
                return Ok(());
            }
        }

        for command in INIT_COMMANDS {
            self.expect_ok(command).await?;
        }
        let select_protocol = self.protocol.to_elm_command();
        self.expect_ok(select_protocol).await?;

        info!(device = %self.device, "OBD adapter initialized successfully");
        Ok(())
    }

    async fn expect_ok(&mut self, command: &str) -> Result<(), ObdError> {
        let reply = self.exchange(command).await?;
        if !elm::clean_lines(&reply)
            .iter()
            .any(|line| line.eq_ignore_ascii_case("OK"))
        {
            warn!(device = %self.device, command, reply = %reply.trim(), "Unexpected reply to AT command");
        }
        Ok(())
    }

    /// Send `command` + `\r`, read until the `>` prompt, return the raw text.
    async fn exchange(&mut self, command: &str) -> Result<String, ObdError> {
        self.resync().await?;

        debug!(device = %self.device, command, "Sending to adapter");
        self.stream.write_all(format!("{command}\r").as_bytes()).await?;
        self.stream.flush().await?;

        let timeout = self.timeout;
        let reply = tokio::time::timeout(timeout, read_until_prompt(&mut self.stream)).await;
        match reply {
            Ok(reply) => {
                let raw = reply?;
                debug!(device = %self.device, command, reply = %raw.trim(), "Adapter reply");
                Ok(raw)
            }
            Err(_) => {
                warn!(device = %self.device, command, "No prompt before timeout");
                self.stale = true;
                if let Err(e) = self.drain_late_reply().await {
                    debug!(device = %self.device, error = %e, "Could not drain late reply");
                }
                Err(ObdError::Timeout(timeout.as_millis() as u64))
            }
        }
    }

    /// Make sure the next reply read belongs to the next command sent.
    ///
    /// Replies to timed-out commands still arrive eventually, and an ELM327
    /// drops a command written while it is busy.
    async fn resync(&mut self) -> Result<(), ObdError> {
        if self.stale && !self.drain_late_reply().await? {
            warn!(device = %self.device, "Adapter still busy with an earlier command");
            return Err(ObdError::Timeout(RESYNC_TIMEOUT.as_millis() as u64));
        }
        self.stream.discard_input()
    }

    /// Wait up to `RESYNC_TIMEOUT` for the outstanding prompt. `Ok(false)` if
    /// it did not arrive.
    async fn drain_late_reply(&mut self) -> Result<bool, ObdError> {
        let late = tokio::time::timeout(RESYNC_TIMEOUT, read_until_prompt(&mut self.stream)).await;
        match late {
            Ok(late) => {
                let late = late?;
                debug!(device = %self.device, reply = %late.trim(), "Discarded late reply");
                self.stale = false;
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }
}

#[async_trait]
impl<S: AdapterStream> AdapterLink for ObdClient<S> {
    fn port(&self) -> &str {
        &self.device
    }

    fn adapter_version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    async fn send(&mut self, command: &str) -> Result<Option<Vec<u8>>, ObdError> {
        let request = Request::parse(command)?;
        let raw = self.exchange(command).await?;
        elm::parse_reply(&request, &raw)
    }

    async fn close(&mut self) -> Result<(), ObdError> {
        info!(device = %self.device, "Closing OBD adapter");
        // Protocol close; the port itself is released on drop
        match tokio::time::timeout(CLOSE_TIMEOUT, self.exchange("ATPC")).await {
            Ok(reply) => reply.map(|_| ()),
            Err(_) => Err(ObdError::Timeout(CLOSE_TIMEOUT.as_millis() as u64)),
        }
    }
}

/// Read until the prompt character, failing with `Closed` on end-of-stream.
async fn read_until_prompt<R>(reader: &mut R) -> Result<String, ObdError>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = [0u8; 128];
    let mut response = Vec::new();

    loop {
        let n = reader.read(&mut buffer).await?;
        if n == 0 {
            return Err(ObdError::Closed);
        }
        response.extend_from_slice(&buffer[..n]);
        if response.contains(&elm::PROMPT) {
            break;
        }
    }

    Ok(String::from_utf8_lossy(&response).into_owned())
}

/// Driver for ELM327 adapters on local serial devices
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialDriver;

#[async_trait]
impl AdapterDriver for SerialDriver {
    fn discover_ports(&self) -> Vec<String> {
        scan::discover_ports()
    }

    async fn open(&self, settings: &LinkSettings) -> Result<Box<dyn AdapterLink>, ObdError> {
        let client = ObdClient::open(settings).await?;
        Ok(Box::new(client))
    }
}

#[cfg(test)]
impl AdapterStream for tokio::io::DuplexStream {}
