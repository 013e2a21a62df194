//! Telemetry snapshots over the full sensor set.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::catalog::{CommandId, Value};
use crate::connection::ConnectionState;
use crate::dtc::{codes_from, DiagnosticTroubleCode};
use crate::executor::{QueryBatch, QueryExecutor};

/// One pass over every sensor plus stored trouble codes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    /// Vehicle connection at the start of the pass
    pub connected: bool,
    pub rpm: Option<f64>,
    pub speed: Option<f64>,
    pub coolant_temp: Option<f64>,
    pub intake_temp: Option<f64>,
    pub fuel_level: Option<f64>,
    pub engine_load: Option<f64>,
    pub errors: Vec<DiagnosticTroubleCode>,
}

/// Coolant and intake air temperature (°C)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Temperatures {
    pub coolant_temp: Option<f64>,
    pub intake_temp: Option<f64>,
}

/// Builds snapshots; no caching, every call reads the vehicle
pub struct TelemetryAggregator {
    executor: Arc<QueryExecutor>,
}

impl TelemetryAggregator {
    pub fn new(executor: Arc<QueryExecutor>) -> Self {
        Self { executor }
    }

    /// Read every sensor and the stored codes, in order, within one batch.
    /// A failed read leaves its field empty and does not stop the pass.
    pub async fn snapshot(&self) -> TelemetrySnapshot {
        let mut batch = self.executor.batch().await;
        let connected = batch.status() == ConnectionState::CarConnected;

        let snapshot = TelemetrySnapshot {
            connected,
            rpm: reading(&mut batch, CommandId::Rpm).await,
            speed: reading(&mut batch, CommandId::Speed).await,
            coolant_temp: reading(&mut batch, CommandId::CoolantTemp).await,
            intake_temp: reading(&mut batch, CommandId::IntakeTemp).await,
            fuel_level: reading(&mut batch, CommandId::FuelLevel).await,
            engine_load: reading(&mut batch, CommandId::EngineLoad).await,
            errors: codes_from(batch.query(CommandId::GetDtc).await.ok().flatten()),
        };
        debug!(?snapshot, "Telemetry snapshot");
        snapshot
    }

    /// Coolant then intake temperature
    pub async fn temperatures(&self) -> Temperatures {
        let mut batch = self.executor.batch().await;
        Temperatures {
            coolant_temp: reading(&mut batch, CommandId::CoolantTemp).await,
            intake_temp: reading(&mut batch, CommandId::IntakeTemp).await,
        }
    }
}

async fn reading(batch: &mut QueryBatch<'_>, id: CommandId) -> Option<f64> {
    batch
        .query(id)
        .await
        .ok()
        .flatten()
        .as_ref()
        .and_then(Value::as_scalar)
}
