//! Adapter configuration
//!
//! Loaded once at startup from an optional TOML file layered under
//! `OBD_*` environment variables (`OBD_PORT`, `OBD_MAC`, `OBD_PROTOCOL`).

use obd_protocol::ObdProtocol;
use serde::Deserialize;
use std::time::Duration;

use crate::error::ConfigError;

/// Upper bound on the whole connect handshake (open, reset, probe)
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable naming the configuration file
pub const CONFIG_PATH_ENV: &str = "OBD_CONFIG";

/// Configuration file used when `OBD_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "obd.toml";

/// Adapter configuration, immutable for the process lifetime
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdapterConfig {
    /// Serial device; discovered when `None`
    pub port: Option<String>,
    /// Adapter MAC or other identifier, reported when discovery fails
    pub mac: Option<String>,
    /// Protocol forced on the adapter
    pub protocol: ObdProtocol,
}

#[derive(Debug, Default, Deserialize)]
struct RawAdapterConfig {
    port: Option<String>,
    mac: Option<String>,
    protocol: Option<String>,
}

impl AdapterConfig {
    /// Read the adapter keys (`port`, `mac`, `protocol`) from loaded settings.
    /// Other keys are ignored. Empty strings count as unset.
    pub fn from_settings(settings: &config::Config) -> Result<Self, ConfigError> {
        let raw: RawAdapterConfig = settings.clone().try_deserialize()?;
        let protocol = match non_empty(raw.protocol) {
            Some(hint) => hint.parse().map_err(ConfigError::Protocol)?,
            None => ObdProtocol::Auto,
        };
        Ok(Self {
            port: non_empty(raw.port),
            mac: non_empty(raw.mac),
            protocol,
        })
    }

    /// Load from the default sources
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_settings(&load_settings(None)?)
    }

    /// Handshake timeout; fixed
    pub fn connect_timeout(&self) -> Duration {
        CONNECT_TIMEOUT
    }
}

/// Build the layered settings: `path` (or `$OBD_CONFIG`, or `obd.toml`) if
/// present, overridden by `OBD_*` environment variables.
pub fn load_settings(path: Option<&str>) -> Result<config::Config, ConfigError> {
    let path = match path {
        Some(path) => path.to_string(),
        None => std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string()),
    };

    let settings = config::Config::builder()
        .add_source(config::File::with_name(&path).required(false))
        .add_source(config::Environment::with_prefix("OBD"))
        .build()?;
    Ok(settings)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{Config, File, FileFormat};

    fn settings(toml: &str) -> Config {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
    }

    #[test]
    fn empty_settings_mean_discovery_and_auto() {
        let config = AdapterConfig::from_settings(&settings("")).unwrap();
        assert_eq!(config, AdapterConfig::default());
        assert_eq!(config.protocol, ObdProtocol::Auto);
        assert_eq!(config.connect_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn reads_adapter_keys() {
        let config = AdapterConfig::from_settings(&settings(
            r#"
            port = "/dev/rfcomm0"
            mac = "00:1D:A5:68:98:8B"
            protocol = "6"
            listen_addr = "127.0.0.1:9000"
            "#,
        ))
        .unwrap();
        assert_eq!(config.port.as_deref(), Some("/dev/rfcomm0"));
        assert_eq!(config.mac.as_deref(), Some("00:1D:A5:68:98:8B"));
        assert_eq!(config.protocol, ObdProtocol::Iso15765_4Can11bit500);
    }

    #[test]
    fn blank_values_are_unset() {
        let config = AdapterConfig::from_settings(&settings("port = \"  \"\nprotocol = \"\"")).unwrap();
        assert_eq!(config.port, None);
        assert_eq!(config.protocol, ObdProtocol::Auto);
    }

    #[test]
    fn bad_protocol_hint_is_rejected() {
        let err = AdapterConfig::from_settings(&settings("protocol = \"can-fd\"")).unwrap_err();
        assert!(matches!(err, ConfigError::Protocol(_)));
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let settings = load_settings(Some("/nonexistent/obd-session-test")).unwrap();
        assert!(AdapterConfig::from_settings(&settings).is_ok());
    }
}
