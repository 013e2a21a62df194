//! OBD-II Diagnostic Session
//!
//! Owns the connection to an ELM327-compatible adapter and turns raw
//! replies into range-validated readings, telemetry snapshots and
//! diagnostic trouble codes. All reads are caller-initiated; nothing polls
//! in the background.

mod catalog;
mod config;
mod connection;
mod dtc;
mod error;
mod executor;
mod session;
mod telemetry;

pub use catalog::{CommandCatalog, CommandId, CommandSpec, DecodeFn, Value};
pub use self::config::{
    load_settings, AdapterConfig, CONFIG_PATH_ENV, CONNECT_TIMEOUT, DEFAULT_CONFIG_PATH,
};
pub use connection::{ConnectionManager, ConnectionState};
pub use dtc::{DiagnosticTroubleCode, DtcManager, UNKNOWN_DESCRIPTION};
pub use error::{ConfigError, ConnectionError, QueryError};
pub use executor::{QueryBatch, QueryExecutor};
pub use session::DiagnosticSession;
pub use telemetry::{TelemetryAggregator, TelemetrySnapshot, Temperatures};
