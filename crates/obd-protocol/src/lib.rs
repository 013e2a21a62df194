//! OBD-II Protocol Implementation
//!
//! This crate provides async serial communication with ELM327-compatible
//! OBD-II adapters. It supports ISO 15765-4 (CAN) and legacy protocols.
//!
//! Callers work through [`AdapterDriver`] and [`AdapterLink`] so the session
//! layer can run against real hardware ([`SerialDriver`]) or a scripted
//! [`MockDriver`].

mod client;
mod dtc;
mod elm;
mod error;
mod link;
pub mod mock;
mod pid;
mod protocol;
mod scan;

pub use client::{
    AdapterStream, ObdClient, SerialDriver, CLOSE_TIMEOUT, DEFAULT_COMMAND_TIMEOUT, RESYNC_TIMEOUT,
};
pub use dtc::{decode_dtc_bytes, decode_dtc_payload, describe, RawDtc};
pub use elm::{parse_reply, Request};
pub use error::ObdError;
pub use link::{probe, AdapterDriver, AdapterLink, AdapterStatus, LinkSettings};
pub use mock::MockDriver;
pub use pid::Pid;
pub use protocol::ObdProtocol;
pub use scan::discover_ports;

/// OBD-II mode constants
pub mod mode {
    /// Current data
    pub const CURRENT_DATA: u8 = 0x01;
    /// Diagnostic trouble codes
    pub const READ_DTC: u8 = 0x03;
    /// Clear trouble codes
    pub const CLEAR_DTC: u8 = 0x04;
}
