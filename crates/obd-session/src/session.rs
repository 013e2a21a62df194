//! Diagnostic session: one adapter connection and the services built on it.

use obd_protocol::AdapterDriver;
use std::sync::Arc;

use crate::catalog::{CommandCatalog, CommandId, Value};
use crate::config::AdapterConfig;
use crate::connection::{ConnectionManager, ConnectionState};
use crate::dtc::{DiagnosticTroubleCode, DtcManager};
use crate::error::{ConnectionError, QueryError};
use crate::executor::QueryExecutor;
use crate::telemetry::{TelemetryAggregator, TelemetrySnapshot, Temperatures};

/// Operator-facing session. Construct once and share by `Arc`.
pub struct DiagnosticSession {
    config: AdapterConfig,
    connection: Arc<ConnectionManager>,
    executor: Arc<QueryExecutor>,
    telemetry: TelemetryAggregator,
    dtc: DtcManager,
}

impl DiagnosticSession {
    /// Session using the standard command catalog
    pub fn new(config: AdapterConfig, driver: Arc<dyn AdapterDriver>) -> Self {
        Self::with_catalog(config, driver, CommandCatalog::standard())
    }

    pub fn with_catalog(
        config: AdapterConfig,
        driver: Arc<dyn AdapterDriver>,
        catalog: CommandCatalog,
    ) -> Self {
        let connection = Arc::new(ConnectionManager::new(driver));
        let executor = Arc::new(QueryExecutor::new(
            Arc::clone(&connection),
            Arc::new(catalog),
        ));
        Self {
            config,
            connection,
            telemetry: TelemetryAggregator::new(Arc::clone(&executor)),
            dtc: DtcManager::new(Arc::clone(&executor)),
            executor,
        }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Connect (or reconnect) using the session configuration
    pub async fn connect(&self) -> Result<ConnectionState, ConnectionError> {
        self.connection.connect(&self.config).await
    }

    pub async fn disconnect(&self) {
        self.connection.disconnect().await
    }

    pub fn status(&self) -> ConnectionState {
        self.connection.status()
    }

    /// Run a single catalog command
    pub async fn query(&self, id: CommandId) -> Result<Option<Value>, QueryError> {
        self.executor.query(id).await
    }

    pub async fn list_errors(&self) -> Vec<DiagnosticTroubleCode> {
        self.dtc.list_errors().await
    }

    pub async fn clear_errors(&self) -> bool {
        self.dtc.clear_errors().await
    }

    pub async fn temperatures(&self) -> Temperatures {
        self.telemetry.temperatures().await
    }

    pub async fn snapshot(&self) -> TelemetrySnapshot {
        self.telemetry.snapshot().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obd_protocol::MockDriver;

    fn session(driver: &MockDriver) -> DiagnosticSession {
        let config = AdapterConfig {
            port: Some("/dev/rfcomm0".to_string()),
            ..AdapterConfig::default()
        };
        DiagnosticSession::new(config, Arc::new(driver.clone()))
    }

    #[tokio::test]
    async fn operator_flow() {
        let driver = MockDriver::new();
        driver.vehicle_present();
        driver.reply("0105", vec![0x5A]);
        driver.reply("010F", vec![0x28]);
        driver.reply("03", vec![0x03, 0x00]);
        driver.reply("04", vec![]);
        let session = session(&driver);

        assert_eq!(session.status(), ConnectionState::NotConnected);
        assert_eq!(session.connect().await, Ok(ConnectionState::CarConnected));

        let temps = session.temperatures().await;
        assert_eq!(temps.coolant_temp, Some(50.0));
        assert_eq!(temps.intake_temp, Some(0.0));

        let errors = session.list_errors().await;
        assert_eq!(errors[0].code, "P0300");
        assert!(session.clear_errors().await);

        session.disconnect().await;
        assert_eq!(session.status(), ConnectionState::NotConnected);
        assert!(!session.snapshot().await.connected);
    }

    #[tokio::test]
    async fn concurrent_snapshots_do_not_interleave() {
        let driver = MockDriver::new();
        driver.vehicle_present();
        for command in ["010C", "010D", "0105", "010F", "012F", "0104"] {
            driver.no_data(command);
        }
        driver.no_data("03");
        let session = Arc::new(session(&driver));
        session.connect().await.unwrap();

        let a = tokio::spawn({
            let session = Arc::clone(&session);
            async move { session.snapshot().await }
        });
        let b = tokio::spawn({
            let session = Arc::clone(&session);
            async move { session.snapshot().await }
        });
        a.await.unwrap();
        b.await.unwrap();

        let sent = driver.sent_commands();
        let pass = ["010C", "010D", "0105", "010F", "012F", "0104", "03"];
        assert_eq!(sent.len(), 1 + 2 * pass.len());
        assert_eq!(sent[1..8], pass);
        assert_eq!(sent[8..], pass);
    }
}
