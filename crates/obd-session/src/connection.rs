//! Connection lifecycle and the tri-state connection state machine.

use obd_protocol::{
    probe, AdapterDriver, AdapterLink, AdapterStatus, LinkSettings, ObdError,
    DEFAULT_COMMAND_TIMEOUT,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::config::AdapterConfig;
use crate::error::ConnectionError;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ConnectionState {
    /// No link open
    NotConnected = 0,
    /// Adapter reachable, vehicle not answering (ignition off, wrong protocol)
    ElmConnected = 1,
    /// Vehicle ECU answering
    CarConnected = 2,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            2 => ConnectionState::CarConnected,
            1 => ConnectionState::ElmConnected,
            _ => ConnectionState::NotConnected,
        }
    }
}

impl From<AdapterStatus> for ConnectionState {
    fn from(status: AdapterStatus) -> Self {
        match status {
            AdapterStatus::NotConnected => ConnectionState::NotConnected,
            AdapterStatus::ElmConnected => ConnectionState::ElmConnected,
            AdapterStatus::CarConnected => ConnectionState::CarConnected,
        }
    }
}

/// Exclusive access to the (possibly absent) link
pub(crate) type LinkGuard<'a> = MutexGuard<'a, Option<Box<dyn AdapterLink>>>;

/// Owns the adapter link and the connection state.
///
/// The link sits behind an async mutex: connect, disconnect and every query
/// take it, so at most one command is in flight. The state is mirrored in an
/// atomic so `status()` never waits.
pub struct ConnectionManager {
    driver: Arc<dyn AdapterDriver>,
    link: Mutex<Option<Box<dyn AdapterLink>>>,
    state: AtomicU8,
}

impl ConnectionManager {
    /// Create a manager in `NotConnected`
    pub fn new(driver: Arc<dyn AdapterDriver>) -> Self {
        Self {
            driver,
            link: Mutex::new(None),
            state: AtomicU8::new(ConnectionState::NotConnected as u8),
        }
    }

    /// Cached state; never touches the adapter
    pub fn status(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub(crate) async fn lock_link(&self) -> LinkGuard<'_> {
        self.link.lock().await
    }

    /// Open a link and probe the adapter.
    ///
    /// An existing link is closed first. On any error the state is
    /// `NotConnected` and no link is held.
    pub async fn connect(&self, config: &AdapterConfig) -> Result<ConnectionState, ConnectionError> {
        let mut link = self.link.lock().await;
        if let Some(current) = link.take() {
            info!(port = current.port(), "Closing current link before reconnecting");
            close_link(current).await;
        }
        self.set_state(ConnectionState::NotConnected);

        let port = self.resolve_port(config)?;
        let settings = LinkSettings {
            port,
            protocol: config.protocol,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        };
        info!(port = %settings.port, protocol = %settings.protocol, "Connecting to OBD adapter");

        let timeout = config.connect_timeout();
        let (opened, status) = match tokio::time::timeout(timeout, self.handshake(&settings)).await {
            Ok(Ok(result)) => result,
            Ok(Err(ObdError::Closed)) => {
                warn!(port = %settings.port, "Adapter closed the port during handshake");
                return Err(ConnectionError::TransportClosedUnexpectedly);
            }
            Ok(Err(e)) => {
                warn!(port = %settings.port, error = %e, "Adapter handshake failed");
                return Err(ConnectionError::HandshakeFailed(e.to_string()));
            }
            Err(_) => {
                warn!(port = %settings.port, ?timeout, "Adapter handshake timed out");
                return Err(ConnectionError::HandshakeFailed(format!(
                    "timed out after {}s",
                    timeout.as_secs()
                )));
            }
        };

        let state = ConnectionState::from(status);
        match state {
            ConnectionState::NotConnected => {
                warn!(port = %settings.port, "Device on port is not an OBD adapter");
                close_link(opened).await;
            }
            _ => {
                info!(port = %settings.port, ?state, "OBD adapter connected");
                *link = Some(opened);
            }
        }
        self.set_state(state);
        Ok(state)
    }

    async fn handshake(
        &self,
        settings: &LinkSettings,
    ) -> Result<(Box<dyn AdapterLink>, AdapterStatus), ObdError> {
        let mut link = self.driver.open(settings).await?;
        let status = probe(link.as_mut()).await?;
        debug!(port = %settings.port, ?status, version = ?link.adapter_version(), "Adapter probed");
        Ok((link, status))
    }

    fn resolve_port(&self, config: &AdapterConfig) -> Result<String, ConnectionError> {
        if let Some(port) = &config.port {
            return Ok(port.clone());
        }
        // First candidate only; later ones are not tried
        match self.driver.discover_ports().into_iter().next() {
            Some(port) => {
                debug!(%port, "Using discovered adapter port");
                Ok(port)
            }
            None => {
                warn!(mac = ?config.mac, "No OBD adapter port found");
                Err(ConnectionError::AdapterNotFound {
                    identifier: config.mac.clone(),
                })
            }
        }
    }

    /// Release the link. Safe to call when already disconnected; close
    /// faults are logged and swallowed.
    pub async fn disconnect(&self) {
        let mut link = self.link.lock().await;
        if let Some(current) = link.take() {
            info!(port = current.port(), "Disconnecting OBD adapter");
            close_link(current).await;
        }
        self.set_state(ConnectionState::NotConnected);
    }
}

async fn close_link(mut link: Box<dyn AdapterLink>) {
    if let Err(e) = link.close().await {
        warn!(port = link.port(), error = %e, "Error closing adapter link");
    }
}
