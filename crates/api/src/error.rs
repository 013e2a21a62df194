//! API Error Types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use obd_session::ConnectionError;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

/// Errors surfaced to HTTP clients
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Connection(ConnectionError::AdapterNotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Connection(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!(%status, error = %self, "Request failed");
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
