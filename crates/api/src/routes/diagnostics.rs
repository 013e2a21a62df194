//! Trouble Code Routes

use axum::{extract::State, Json};
use obd_session::DiagnosticTroubleCode;
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;

/// Response for the clear endpoint
#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub cleared: bool,
}

/// Stored trouble codes
pub async fn list_errors(State(state): State<Arc<AppState>>) -> Json<Vec<DiagnosticTroubleCode>> {
    Json(state.session.list_errors().await)
}

/// Clear stored trouble codes
pub async fn clear_errors(State(state): State<Arc<AppState>>) -> Json<ClearResponse> {
    Json(ClearResponse {
        cleared: state.session.clear_errors().await,
    })
}
