//! Single-command execution: send, decode, range-check.

use obd_protocol::{AdapterLink, ObdError};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::catalog::{CommandCatalog, CommandId, Value};
use crate::connection::{ConnectionManager, ConnectionState, LinkGuard};
use crate::error::QueryError;

/// Runs catalog commands against the managed link
pub struct QueryExecutor {
    connection: Arc<ConnectionManager>,
    catalog: Arc<CommandCatalog>,
}

impl QueryExecutor {
    pub fn new(connection: Arc<ConnectionManager>, catalog: Arc<CommandCatalog>) -> Self {
        Self {
            connection,
            catalog,
        }
    }

    /// Run one command.
    ///
    /// `Ok(None)` means the vehicle answered `NO DATA` or the decoded value
    /// was outside its valid range. Returns `NotConnected` without touching
    /// the adapter unless a vehicle is connected.
    pub async fn query(&self, id: CommandId) -> Result<Option<Value>, QueryError> {
        let mut batch = self.batch().await;
        batch.query(id).await
    }

    /// Hold the link for a sequence of queries; nothing else reaches the
    /// adapter until the batch is dropped.
    pub async fn batch(&self) -> QueryBatch<'_> {
        QueryBatch {
            connection: &self.connection,
            catalog: &self.catalog,
            link: self.connection.lock_link().await,
        }
    }

    pub fn catalog(&self) -> &CommandCatalog {
        &self.catalog
    }
}

/// Exclusive query sequence, see [`QueryExecutor::batch`]
pub struct QueryBatch<'a> {
    connection: &'a ConnectionManager,
    catalog: &'a CommandCatalog,
    link: LinkGuard<'a>,
}

impl QueryBatch<'_> {
    /// Connection state; cannot change while the batch is held
    pub fn status(&self) -> ConnectionState {
        self.connection.status()
    }

    /// Run one command within the batch
    pub async fn query(&mut self, id: CommandId) -> Result<Option<Value>, QueryError> {
        if self.connection.status() != ConnectionState::CarConnected {
            debug!(command = %id, "Query skipped, vehicle not connected");
            return Err(QueryError::NotConnected);
        }
        let Some(link) = self.link.as_deref_mut() else {
            return Err(QueryError::NotConnected);
        };

        let result = execute(self.catalog, link, id).await;
        if let Err(e) = &result {
            warn!(command = %id, error = %e, cause = ?std::error::Error::source(e).map(|s| s.to_string()), "Query failed");
        }
        result
    }
}

async fn execute(
    catalog: &CommandCatalog,
    link: &mut dyn AdapterLink,
    id: CommandId,
) -> Result<Option<Value>, QueryError> {
    let spec = catalog.get(id).ok_or_else(|| QueryError::Unsupported {
        command: id.to_string(),
    })?;

    let payload = match link.send(&spec.command).await {
        Ok(Some(payload)) => payload,
        Ok(None) => {
            debug!(command = %id, "No data");
            return Ok(None);
        }
        Err(ObdError::UnsupportedCommand(_)) => {
            return Err(QueryError::Unsupported {
                command: id.to_string(),
            })
        }
        Err(source) => {
            return Err(QueryError::Transport {
                command: id.to_string(),
                source,
            })
        }
    };

    let value = (spec.decode)(&payload).map_err(|reason| QueryError::Decode {
        command: id.to_string(),
        reason,
    })?;

    if let Err(e) = spec.validate(&value) {
        debug!(command = %id, error = %e, "Discarding out-of-range reading");
        return Ok(None);
    }
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CommandSpec;
    use crate::config::AdapterConfig;
    use data_validator::ValueRange;
    use obd_protocol::MockDriver;
    use proptest::prelude::*;

    async fn connected(driver: &MockDriver, catalog: CommandCatalog) -> QueryExecutor {
        driver.vehicle_present();
        let connection = Arc::new(ConnectionManager::new(Arc::new(driver.clone())));
        let config = AdapterConfig {
            port: Some("/dev/rfcomm0".to_string()),
            ..AdapterConfig::default()
        };
        connection.connect(&config).await.unwrap();
        QueryExecutor::new(connection, Arc::new(catalog))
    }

    fn fixed_rpm(decode: fn(&[u8]) -> Result<Value, String>) -> CommandCatalog {
        CommandCatalog::standard().with_spec(CommandSpec::new(
            CommandId::Rpm,
            "010C",
            decode,
            Some(ValueRange::at_least(0.0)),
            "rpm",
        ))
    }

    #[tokio::test]
    async fn not_connected_skips_transport() {
        let driver = MockDriver::new();
        let connection = Arc::new(ConnectionManager::new(Arc::new(driver.clone())));
        let executor = QueryExecutor::new(connection, Arc::new(CommandCatalog::standard()));

        assert_eq!(executor.query(CommandId::Rpm).await, Err(QueryError::NotConnected));
        assert!(driver.sent_commands().is_empty());
    }

    #[tokio::test]
    async fn adapter_only_is_not_connected() {
        let driver = MockDriver::new();
        driver.no_data("0100");
        let connection = Arc::new(ConnectionManager::new(Arc::new(driver.clone())));
        let config = AdapterConfig {
            port: Some("/dev/rfcomm0".to_string()),
            ..AdapterConfig::default()
        };
        connection.connect(&config).await.unwrap();
        let executor = QueryExecutor::new(connection, Arc::new(CommandCatalog::standard()));

        assert_eq!(executor.query(CommandId::Speed).await, Err(QueryError::NotConnected));
        assert_eq!(driver.sent_commands(), vec!["0100".to_string()]);
    }

    #[tokio::test]
    async fn rpm_in_range() {
        let driver = MockDriver::new();
        driver.reply("010C", vec![0x0D, 0x48]);
        let executor = connected(&driver, CommandCatalog::standard()).await;
        assert_eq!(executor.query(CommandId::Rpm).await, Ok(Some(Value::Scalar(850.0))));
    }

    #[tokio::test]
    async fn decoded_value_is_returned() {
        let driver = MockDriver::new();
        let executor = connected(&driver, fixed_rpm(|_| Ok(Value::Scalar(850.0)))).await;
        driver.reply("010C", vec![0x00, 0x00]);
        assert_eq!(executor.query(CommandId::Rpm).await, Ok(Some(Value::Scalar(850.0))));
    }

    #[tokio::test]
    async fn out_of_range_is_absent() {
        let driver = MockDriver::new();
        let executor = connected(&driver, fixed_rpm(|_| Ok(Value::Scalar(-5.0)))).await;
        driver.reply("010C", vec![0x00, 0x00]);
        assert_eq!(executor.query(CommandId::Rpm).await, Ok(None));
    }

    #[tokio::test]
    async fn zero_readings_are_present() {
        let driver = MockDriver::new();
        driver.reply("010C", vec![0x00, 0x00]);
        driver.reply("012F", vec![0x00]);
        let executor = connected(&driver, CommandCatalog::standard()).await;
        assert_eq!(executor.query(CommandId::Rpm).await, Ok(Some(Value::Scalar(0.0))));
        assert_eq!(executor.query(CommandId::FuelLevel).await, Ok(Some(Value::Scalar(0.0))));
    }

    #[tokio::test]
    async fn no_data_is_absent() {
        let driver = MockDriver::new();
        driver.no_data("012F");
        let executor = connected(&driver, CommandCatalog::standard()).await;
        assert_eq!(executor.query(CommandId::FuelLevel).await, Ok(None));
    }

    #[tokio::test]
    async fn fault_mapping() {
        let driver = MockDriver::new();
        driver.fail("010D", ObdError::Timeout(10_000));
        driver.reply("010C", vec![0x0D]);
        let executor = connected(&driver, CommandCatalog::standard()).await;

        assert_eq!(
            executor.query(CommandId::Speed).await,
            Err(QueryError::Transport {
                command: "SPEED".to_string(),
                source: ObdError::Timeout(10_000)
            })
        );
        assert!(matches!(
            executor.query(CommandId::Rpm).await,
            Err(QueryError::Decode { ref command, .. }) if command == "RPM"
        ));
        // Unscripted: the mock answers `?`
        assert_eq!(
            executor.query(CommandId::EngineLoad).await,
            Err(QueryError::Unsupported {
                command: "ENGINE_LOAD".to_string()
            })
        );
    }

    #[tokio::test]
    async fn missing_catalog_entry_is_unsupported() {
        let driver = MockDriver::new();
        let catalog = CommandCatalog::from_specs(Vec::new());
        let executor = connected(&driver, catalog).await;
        assert_eq!(
            executor.query(CommandId::Rpm).await,
            Err(QueryError::Unsupported {
                command: "RPM".to_string()
            })
        );
        assert_eq!(driver.sent_commands(), vec!["0100".to_string()]);
    }

    #[tokio::test]
    async fn one_command_per_query() {
        let driver = MockDriver::new();
        driver.reply("010D", vec![0x3C]);
        let executor = connected(&driver, CommandCatalog::standard()).await;
        executor.query(CommandId::Speed).await.unwrap();
        assert_eq!(driver.sent_commands(), vec!["0100".to_string(), "010D".to_string()]);
    }

    #[tokio::test]
    async fn query_after_disconnect() {
        let driver = MockDriver::new();
        driver.reply("010D", vec![0x3C]);
        let executor = connected(&driver, CommandCatalog::standard()).await;
        executor.connection.disconnect().await;
        assert_eq!(executor.query(CommandId::Speed).await, Err(QueryError::NotConnected));
    }

    fn ranged_commands() -> Vec<(CommandId, &'static str, usize)> {
        vec![
            (CommandId::Rpm, "010C", 2),
            (CommandId::Speed, "010D", 1),
            (CommandId::FuelLevel, "012F", 1),
            (CommandId::EngineLoad, "0104", 1),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn never_returns_out_of_range(payload in proptest::collection::vec(any::<u8>(), 0..4)) {
            let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            runtime.block_on(async {
                let driver = MockDriver::new();
                for (_, command, _) in ranged_commands() {
                    driver.reply(command, payload.clone());
                }
                let executor = connected(&driver, CommandCatalog::standard()).await;
                for (id, _, need) in ranged_commands() {
                    let result = executor.query(id).await;
                    if payload.len() < need {
                        prop_assert!(matches!(result, Err(QueryError::Decode { .. })), "expected Decode error, got {:?}", result);
                        continue;
                    }
                    let range = executor.catalog().get(id).unwrap().range.unwrap();
                    match result {
                        Ok(Some(Value::Scalar(v))) => prop_assert!(range.contains(v)),
                        other => prop_assert!(false, "unexpected {:?}", other),
                    }
                }
                Ok(())
            })?;
        }

        #[test]
        fn signed_decode_collapses_below_zero(raw in any::<i16>()) {
            let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            runtime.block_on(async {
                let driver = MockDriver::new();
                let executor = connected(&driver, fixed_rpm(|b| {
                    let raw = i16::from_be_bytes([b[0], b[1]]);
                    Ok(Value::Scalar(f64::from(raw) / 4.0))
                })).await;
                driver.reply("010C", raw.to_be_bytes().to_vec());
                let result = executor.query(CommandId::Rpm).await;
                if raw < 0 {
                    prop_assert_eq!(result, Ok(None));
                } else {
                    prop_assert_eq!(result, Ok(Some(Value::Scalar(f64::from(raw) / 4.0))));
                }
                Ok(())
            })?;
        }
    }
}
