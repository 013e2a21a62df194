//! Mock adapter driver for testing.
//!
//! Supports scripted per-command replies and command recording. Clones of a
//! `MockDriver` share one script, so a test can keep a handle after giving
//! the driver to a session.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::ObdError;
use crate::link::{AdapterDriver, AdapterLink, LinkSettings};

/// Scripted reply to one command
#[derive(Debug, Clone)]
enum MockReply {
    Data(Vec<u8>),
    NoData,
    Fault(ObdError),
}

#[derive(Debug)]
struct MockState {
    ports: Vec<String>,
    version: Option<String>,
    open_error: Option<ObdError>,
    open_delay: Option<Duration>,
    close_error: Option<ObdError>,
    replies: HashMap<String, MockReply>,
    sent: Vec<String>,
    opened: Vec<LinkSettings>,
    closed: usize,
}

/// Mock driver with scripted replies and command recording.
#[derive(Debug, Clone)]
pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
}

impl MockDriver {
    /// A driver whose links identify as `ELM327 v1.5`, with no ports and
    /// no scripted replies. Unscripted commands are answered with `?`.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                ports: Vec::new(),
                version: Some("ELM327 v1.5".to_string()),
                open_error: None,
                open_delay: None,
                close_error: None,
                replies: HashMap::new(),
                sent: Vec::new(),
                opened: Vec::new(),
                closed: 0,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a port returned by discovery
    pub fn add_port(&self, port: &str) {
        self.state().ports.push(port.to_string());
    }

    /// Set the `ATZ` banner; `None` simulates a non-ELM device
    pub fn set_version(&self, version: Option<&str>) {
        self.state().version = version.map(str::to_string);
    }

    /// Answer the supported-PIDs probe so links report `CarConnected`
    pub fn vehicle_present(&self) {
        self.reply("0100", vec![0xBE, 0x1F, 0xA8, 0x13]);
    }

    /// Reply to `command` with data bytes
    pub fn reply(&self, command: &str, data: Vec<u8>) {
        self.state()
            .replies
            .insert(command.to_string(), MockReply::Data(data));
    }

    /// Reply to `command` with `NO DATA`
    pub fn no_data(&self, command: &str) {
        self.state()
            .replies
            .insert(command.to_string(), MockReply::NoData);
    }

    /// Fail `command` with `error`
    pub fn fail(&self, command: &str, error: ObdError) {
        self.state()
            .replies
            .insert(command.to_string(), MockReply::Fault(error));
    }

    /// Make the next and all following `open` calls fail
    pub fn fail_open(&self, error: Option<ObdError>) {
        self.state().open_error = error;
    }

    /// Delay `open` (combine with a paused tokio clock)
    pub fn delay_open(&self, delay: Duration) {
        self.state().open_delay = Some(delay);
    }

    /// Make `close` fail
    pub fn fail_close(&self, error: ObdError) {
        self.state().close_error = Some(error);
    }

    /// Commands sent over any link, in order
    pub fn sent_commands(&self) -> Vec<String> {
        self.state().sent.clone()
    }

    /// Settings of every `open` call, in order
    pub fn opened(&self) -> Vec<LinkSettings> {
        self.state().opened.clone()
    }

    /// Number of `close` calls
    pub fn close_count(&self) -> usize {
        self.state().closed
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AdapterDriver for MockDriver {
    fn discover_ports(&self) -> Vec<String> {
        self.state().ports.clone()
    }

    async fn open(&self, settings: &LinkSettings) -> Result<Box<dyn AdapterLink>, ObdError> {
        let delay = self.state().open_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        state.opened.push(settings.clone());
        if let Some(err) = state.open_error.clone() {
            return Err(err);
        }
        Ok(Box::new(MockLink {
            port: settings.port.clone(),
            version: state.version.clone(),
            state: Arc::clone(&self.state),
        }))
    }
}

/// A link opened by [`MockDriver`]
#[derive(Debug)]
pub struct MockLink {
    port: String,
    version: Option<String>,
    state: Arc<Mutex<MockState>>,
}

#[async_trait]
impl AdapterLink for MockLink {
    fn port(&self) -> &str {
        &self.port
    }

    fn adapter_version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    async fn send(&mut self, command: &str) -> Result<Option<Vec<u8>>, ObdError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.sent.push(command.to_string());
        match state.replies.get(command).cloned() {
            Some(MockReply::Data(data)) => Ok(Some(data)),
            Some(MockReply::NoData) => Ok(None),
            Some(MockReply::Fault(err)) => Err(err),
            None => Err(ObdError::UnsupportedCommand(command.to_string())),
        }
    }

    async fn close(&mut self) -> Result<(), ObdError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.closed += 1;
        match state.close_error.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ObdProtocol;

    fn settings(port: &str) -> LinkSettings {
        LinkSettings {
            port: port.to_string(),
            protocol: ObdProtocol::Auto,
            command_timeout: Duration::from_millis(100),
        }
    }

    #[tokio::test]
    async fn records_sent_commands() {
        let driver = MockDriver::new();
        driver.reply("010C", vec![0x1A, 0xF8]);
        let mut link = driver.open(&settings("/dev/rfcomm0")).await.unwrap();

        assert_eq!(link.send("010C").await.unwrap(), Some(vec![0x1A, 0xF8]));
        assert_eq!(driver.sent_commands(), vec!["010C".to_string()]);
        assert_eq!(driver.opened()[0].port, "/dev/rfcomm0");
    }

    #[tokio::test]
    async fn unscripted_command_is_unsupported() {
        let driver = MockDriver::new();
        let mut link = driver.open(&settings("/dev/rfcomm0")).await.unwrap();
        let err = link.send("0111").await.unwrap_err();
        assert_eq!(err, ObdError::UnsupportedCommand("0111".to_string()));
    }

    #[tokio::test]
    async fn no_data_and_faults() {
        let driver = MockDriver::new();
        driver.no_data("012F");
        driver.fail("010D", ObdError::Timeout(100));
        let mut link = driver.open(&settings("/dev/rfcomm0")).await.unwrap();
        assert_eq!(link.send("012F").await.unwrap(), None);
        assert_eq!(link.send("010D").await.unwrap_err(), ObdError::Timeout(100));
    }

    #[tokio::test]
    async fn open_failure_is_recorded() {
        let driver = MockDriver::new();
        driver.fail_open(Some(ObdError::SerialError("permission denied".into())));
        assert!(driver.open(&settings("/dev/ttyUSB0")).await.is_err());
        assert_eq!(driver.opened().len(), 1);
    }

    #[tokio::test]
    async fn clones_share_script() {
        let driver = MockDriver::new();
        let handle = driver.clone();
        handle.add_port("/dev/rfcomm0");
        assert_eq!(driver.discover_ports(), vec!["/dev/rfcomm0".to_string()]);
    }
}
