//! Connection Routes

use axum::{extract::State, Json};
use obd_session::ConnectionState;
use serde::Serialize;
use std::sync::Arc;

use crate::{ApiError, AppState};

/// Response for connect and disconnect
#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub state: ConnectionState,
}

/// Response for the status endpoint
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub state: ConnectionState,
    /// Whether a vehicle is answering
    pub connected: bool,
}

/// Connect (or reconnect) to the adapter
pub async fn connect(State(state): State<Arc<AppState>>) -> Result<Json<StateResponse>, ApiError> {
    let connection = state.session.connect().await?;
    Ok(Json(StateResponse { state: connection }))
}

/// Release the adapter
pub async fn disconnect(State(state): State<Arc<AppState>>) -> Json<StateResponse> {
    state.session.disconnect().await;
    Json(StateResponse {
        state: state.session.status(),
    })
}

/// Cached connection state
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let connection = state.session.status();
    Json(StatusResponse {
        state: connection,
        connected: connection == ConnectionState::CarConnected,
    })
}

#[cfg(test)]
mod tests {
    use crate::test_support::{app, call};
    use axum::http::{Method, StatusCode};
    use obd_protocol::{MockDriver, ObdError};

    #[tokio::test]
    async fn connect_status_disconnect() {
        let driver = MockDriver::new();
        driver.vehicle_present();
        let app = app(&driver);

        let (status, body) = call(&app, Method::POST, "/api/v1/connect").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "car_connected");

        let (_, body) = call(&app, Method::GET, "/api/v1/status").await;
        assert_eq!(body["state"], "car_connected");
        assert_eq!(body["connected"], true);

        let (status, body) = call(&app, Method::POST, "/api/v1/disconnect").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "not_connected");

        let (_, body) = call(&app, Method::GET, "/api/v1/status").await;
        assert_eq!(body["connected"], false);
    }

    #[tokio::test]
    async fn adapter_without_vehicle() {
        let driver = MockDriver::new();
        driver.fail("0100", ObdError::BusError("UNABLE TO CONNECT".into()));
        let app = app(&driver);

        let (status, body) = call(&app, Method::POST, "/api/v1/connect").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "elm_connected");

        let (_, body) = call(&app, Method::GET, "/api/v1/status").await;
        assert_eq!(body["connected"], false);
    }

    #[tokio::test]
    async fn handshake_failure_is_bad_gateway() {
        let driver = MockDriver::new();
        driver.fail_open(Some(ObdError::SerialError("Permission denied".into())));
        let app = app(&driver);

        let (status, body) = call(&app, Method::POST, "/api/v1/connect").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("Permission denied"));
    }

    #[tokio::test]
    async fn disconnect_when_idle() {
        let app = app(&MockDriver::new());
        let (status, body) = call(&app, Method::POST, "/api/v1/disconnect").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "not_connected");
    }
}
