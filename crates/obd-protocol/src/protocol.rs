//! OBD-II Protocol Definitions

use crate::error::ObdError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported OBD-II protocols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObdProtocol {
    /// Automatic protocol detection
    Auto,
    /// SAE J1850 PWM (41.6 kbaud)
    J1850Pwm,
    /// SAE J1850 VPW (10.4 kbaud)
    J1850Vpw,
    /// ISO 9141-2 (10.4 kbaud, 5 baud init)
    Iso9141_2,
    /// ISO 14230-4 KWP (slow init, 10.4 kbaud)
    Iso14230_4Kwp,
    /// ISO 14230-4 KWP (fast init, 10.4 kbaud)
    Iso14230_4KwpFast,
    /// ISO 15765-4 CAN (11 bit ID, 500 kbaud)
    Iso15765_4Can11bit500,
    /// ISO 15765-4 CAN (29 bit ID, 500 kbaud)
    Iso15765_4Can29bit500,
    /// ISO 15765-4 CAN (11 bit ID, 250 kbaud)
    Iso15765_4Can11bit250,
    /// ISO 15765-4 CAN (29 bit ID, 250 kbaud)
    Iso15765_4Can29bit250,
}

const ALL: [(ObdProtocol, &str); 10] = [
    (ObdProtocol::Auto, "auto"),
    (ObdProtocol::J1850Pwm, "sae-j1850-pwm"),
    (ObdProtocol::J1850Vpw, "sae-j1850-vpw"),
    (ObdProtocol::Iso9141_2, "iso9141-2"),
    (ObdProtocol::Iso14230_4Kwp, "iso14230-4-kwp"),
    (ObdProtocol::Iso14230_4KwpFast, "iso14230-4-kwp-fast"),
    (ObdProtocol::Iso15765_4Can11bit500, "iso15765-4-can-11bit-500"),
    (ObdProtocol::Iso15765_4Can29bit500, "iso15765-4-can-29bit-500"),
    (ObdProtocol::Iso15765_4Can11bit250, "iso15765-4-can-11bit-250"),
    (ObdProtocol::Iso15765_4Can29bit250, "iso15765-4-can-29bit-250"),
];

impl ObdProtocol {
    /// Get the ELM327 AT command for this protocol
    pub fn to_elm_command(&self) -> &'static str {
        match self {
            ObdProtocol::Auto => "ATSP0",
            ObdProtocol::J1850Pwm => "ATSP1",
            ObdProtocol::J1850Vpw => "ATSP2",
            ObdProtocol::Iso9141_2 => "ATSP3",
            ObdProtocol::Iso14230_4Kwp => "ATSP4",
            ObdProtocol::Iso14230_4KwpFast => "ATSP5",
            ObdProtocol::Iso15765_4Can11bit500 => "ATSP6",
            ObdProtocol::Iso15765_4Can29bit500 => "ATSP7",
            ObdProtocol::Iso15765_4Can11bit250 => "ATSP8",
            ObdProtocol::Iso15765_4Can29bit250 => "ATSP9",
        }
    }

    /// ELM327 protocol number (the digit after `ATSP`)
    pub fn elm_number(&self) -> char {
        self.to_elm_command().chars().last().unwrap_or('0')
    }

    /// Kebab-case name accepted by [`FromStr`]
    pub fn name(&self) -> &'static str {
        ALL.iter()
            .find(|(p, _)| p == self)
            .map(|(_, name)| *name)
            .unwrap_or("auto")
    }

    /// Check if this is a CAN protocol
    pub fn is_can(&self) -> bool {
        matches!(
            self,
            ObdProtocol::Iso15765_4Can11bit500
                | ObdProtocol::Iso15765_4Can29bit500
                | ObdProtocol::Iso15765_4Can11bit250
                | ObdProtocol::Iso15765_4Can29bit250
        )
    }

    /// Get the default baud rate for serial communication
    pub fn default_baud_rate(&self) -> u32 {
        // ELM327 adapters typically use 38400 or higher
        if self.is_can() {
            115200
        } else {
            38400
        }
    }
}

impl Default for ObdProtocol {
    fn default() -> Self {
        ObdProtocol::Auto
    }
}

impl fmt::Display for ObdProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ObdProtocol {
    type Err = ObdError;

    /// Accepts an ELM protocol number (`"0"`..`"9"`), `"auto"`, or a kebab-case name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hint = s.trim().to_ascii_lowercase();
        if hint.is_empty() {
            return Ok(ObdProtocol::Auto);
        }
        ALL.iter()
            .find(|(p, name)| *name == hint || (hint.len() == 1 && hint.starts_with(p.elm_number())))
            .map(|(p, _)| *p)
            .ok_or_else(|| ObdError::UnsupportedProtocol(s.to_string()))
    }
}
