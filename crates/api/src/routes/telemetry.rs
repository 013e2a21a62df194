//! Telemetry Routes

use axum::{extract::State, Json};
use obd_session::{TelemetrySnapshot, Temperatures};
use std::sync::Arc;

use crate::AppState;

/// Coolant and intake temperature
pub async fn temperature(State(state): State<Arc<AppState>>) -> Json<Temperatures> {
    Json(state.session.temperatures().await)
}

/// Full sensor snapshot with trouble codes
pub async fn snapshot(State(state): State<Arc<AppState>>) -> Json<TelemetrySnapshot> {
    Json(state.session.snapshot().await)
}
