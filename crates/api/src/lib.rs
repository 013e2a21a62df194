//! OBD Gateway API Server
//!
//! HTTP front-end for one diagnostic session: connect, disconnect, status,
//! trouble codes, temperatures and full telemetry snapshots.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use obd_protocol::AdapterDriver;
use obd_session::{ConnectionState, DiagnosticSession};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod config;
mod error;
mod routes;

pub use self::config::{GatewayConfig, DEFAULT_LISTEN_ADDR};
pub use error::ApiError;

/// Application state shared across handlers
pub struct AppState {
    /// Diagnostic session; internally synchronized
    pub session: Arc<DiagnosticSession>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(session: Arc<DiagnosticSession>) -> Self {
        Self {
            session,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub adapter: ConnectionState,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/connect", post(routes::connection::connect))
        .route("/api/v1/disconnect", post(routes::connection::disconnect))
        .route("/api/v1/status", get(routes::connection::status))
        .route("/api/v1/errors", get(routes::diagnostics::list_errors))
        .route("/api/v1/errors/clear", post(routes::diagnostics::clear_errors))
        .route("/api/v1/temperature", get(routes::telemetry::temperature))
        .route("/api/v1/snapshot", get(routes::telemetry::snapshot))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        adapter: state.session.status(),
    })
}

/// Initialize logging; `RUST_LOG` overrides the default `info` level
pub fn init_logging() -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}

/// Serve until Ctrl-C, then disconnect the adapter
pub async fn run_server(config: GatewayConfig, driver: Arc<dyn AdapterDriver>) -> std::io::Result<()> {
    let session = Arc::new(DiagnosticSession::new(config.adapter.clone(), driver));
    let app = create_router(Arc::new(AppState::new(Arc::clone(&session))));

    info!("Starting API server on {}", config.listen_addr);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down, releasing adapter");
    session.disconnect().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}
