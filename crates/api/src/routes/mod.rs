//! Route handlers, one module per operator concern

pub mod connection;
pub mod diagnostics;
pub mod telemetry;
