//! Gateway configuration

use obd_session::{load_settings, AdapterConfig, ConfigError};

/// Listen address used when `listen_addr` / `OBD_LISTEN_ADDR` is unset
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Gateway configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// HTTP listen address
    pub listen_addr: String,
    /// Adapter settings for the session
    pub adapter: AdapterConfig,
}

impl GatewayConfig {
    /// Load from `$OBD_CONFIG` (default `obd.toml`) and `OBD_*` variables
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_settings(&load_settings(None)?)
    }

    pub fn from_settings(settings: &config::Config) -> Result<Self, ConfigError> {
        let listen_addr = match settings.get_string("listen_addr") {
            Ok(addr) if !addr.trim().is_empty() => addr,
            Ok(_) | Err(config::ConfigError::NotFound(_)) => DEFAULT_LISTEN_ADDR.to_string(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            listen_addr,
            adapter: AdapterConfig::from_settings(settings)?,
        })
    }
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
    fn defaults() {
        let config = GatewayConfig::from_settings(&settings("")).unwrap();
        assert_eq!(config.listen_addr, DEFAULT_LISTEN_ADDR);
        assert_eq!(config.adapter, AdapterConfig::default());
    }

    #[test]
    fn listen_addr_and_adapter() {
        let config = GatewayConfig::from_settings(&settings(
            "listen_addr = \"127.0.0.1:9000\"\nport = \"/dev/ttyUSB0\"",
        ))
        .unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:9000");
        assert_eq!(config.adapter.port.as_deref(), Some("/dev/ttyUSB0"));
    }
}
