//! Diagnostic trouble code listing and clearing.

use obd_protocol::RawDtc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::catalog::{CommandId, Value};
use crate::executor::QueryExecutor;

/// Description used when the adapter reports none
pub const UNKNOWN_DESCRIPTION: &str = "unknown error";

/// A stored trouble code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticTroubleCode {
    pub code: String,
    pub description: String,
}

impl DiagnosticTroubleCode {
    /// `None` for an empty code
    pub fn from_raw(raw: RawDtc) -> Option<Self> {
        let code = raw.code.trim().to_string();
        if code.is_empty() {
            return None;
        }
        let description = raw
            .description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_DESCRIPTION.to_string());
        Some(Self { code, description })
    }
}

/// Convert a GET_DTC result into trouble codes; anything but a code list
/// yields an empty sequence.
pub(crate) fn codes_from(value: Option<Value>) -> Vec<DiagnosticTroubleCode> {
    match value {
        Some(Value::Codes(raw)) => raw
            .into_iter()
            .filter_map(DiagnosticTroubleCode::from_raw)
            .collect(),
        _ => Vec::new(),
    }
}

/// Lists and clears trouble codes
pub struct DtcManager {
    executor: Arc<QueryExecutor>,
}

impl DtcManager {
    pub fn new(executor: Arc<QueryExecutor>) -> Self {
        Self { executor }
    }

    /// Stored trouble codes; empty when none, when not connected or on any
    /// fault.
    pub async fn list_errors(&self) -> Vec<DiagnosticTroubleCode> {
        let codes = codes_from(self.executor.query(CommandId::GetDtc).await.ok().flatten());
        debug!(count = codes.len(), "Trouble codes read");
        codes
    }

    /// Clear stored codes; true only when the ECU acknowledged
    pub async fn clear_errors(&self) -> bool {
        let cleared = matches!(self.executor.query(CommandId::ClearDtc).await, Ok(Some(_)));
        info!(cleared, "Clear trouble codes");
        cleared
    }
}
