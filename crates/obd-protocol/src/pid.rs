//! OBD-II PID Definitions and Response Parsing
//!
//! Defines the standard Mode 01 Parameter IDs (PIDs) used by the session
//! layer and their decoding formulas.

use crate::error::ObdError;
use crate::mode;
use serde::{Deserialize, Serialize};

/// Standard OBD-II PIDs for Mode 01 (current data)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Pid {
    /// Supported PIDs 01-20 bitmap (0x00)
    SupportedPids = 0x00,
    /// Calculated engine load (0x04)
    EngineLoad = 0x04,
    /// Engine coolant temperature (0x05)
    CoolantTemp = 0x05,
    /// Engine RPM (0x0C)
    Rpm = 0x0C,
    /// Vehicle speed (0x0D)
    Speed = 0x0D,
    /// Intake air temperature (0x0F)
    IntakeTemp = 0x0F,
    /// Fuel tank level input (0x2F)
    FuelLevel = 0x2F,
}

impl Pid {
    /// Get the PID hex value
    pub fn as_hex(&self) -> u8 {
        *self as u8
    }

    /// ELM327 command string for a Mode 01 request, e.g. `010C`
    pub fn command(&self) -> String {
        format!("{:02X}{:02X}", mode::CURRENT_DATA, self.as_hex())
    }

    /// Get the number of response bytes for this PID
    pub fn response_bytes(&self) -> usize {
        match self {
            Pid::SupportedPids => 4,
            Pid::Rpm => 2,
            _ => 1,
        }
    }

    /// Decode the data bytes (after the `41 xx` echo) using the PID formula
    pub fn decode(&self, bytes: &[u8]) -> Result<f64, ObdError> {
        let need = self.response_bytes();
        if bytes.len() < need {
            return Err(ObdError::ShortPayload {
                command: self.command(),
                expected: need,
                actual: bytes.len(),
            });
        }
        let a = bytes[0] as f64;
        let value = match self {
            // Bitmap, reported as its integer value
            Pid::SupportedPids => u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
            // RPM: ((A*256)+B)/4
            Pid::Rpm => ((a * 256.0) + bytes[1] as f64) / 4.0,
            // Speed: A (km/h)
            Pid::Speed => a,
            // Temperatures: A - 40 (°C)
            Pid::CoolantTemp | Pid::IntakeTemp => a - 40.0,
            // Percentages: A * 100 / 255 (%)
            Pid::EngineLoad | Pid::FuelLevel => a * 100.0 / 255.0,
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpm_decode() {
        // 1A 2B => ((0x1A * 256) + 0x2B) / 4 = (26*256 + 43) / 4 = 6699/4 = 1674.75
        let value = Pid::Rpm.decode(&[0x1A, 0x2B]).unwrap();
        assert!((value - 1674.75).abs() < 0.01);
    }

    #[test]
    fn test_coolant_temp_decode() {
        // 0x73 = 115, so temp = 115 - 40 = 75°C
        let value = Pid::CoolantTemp.decode(&[0x73]).unwrap();
        assert!((value - 75.0).abs() < 0.01);
    }

    #[test]
    fn test_intake_temp_below_zero() {
        let value = Pid::IntakeTemp.decode(&[0x1E]).unwrap();
        assert!((value - -10.0).abs() < 0.01);
    }

    #[test]
    fn test_speed_decode() {
        // 0x55 = 85 km/h
        let value = Pid::Speed.decode(&[0x55]).unwrap();
        assert!((value - 85.0).abs() < 0.01);
    }

    #[test]
    fn test_zero_readings_are_values() {
        assert_eq!(Pid::Rpm.decode(&[0x00, 0x00]).unwrap(), 0.0);
        assert_eq!(Pid::FuelLevel.decode(&[0x00]).unwrap(), 0.0);
    }

    #[test]
    fn test_percent_decode_full_scale() {
        let value = Pid::FuelLevel.decode(&[0xFF]).unwrap();
        assert!((value - 100.0).abs() < 0.01);
        let value = Pid::EngineLoad.decode(&[127]).unwrap();
        assert!((value - 49.803).abs() < 0.01);
    }

    #[test]
    fn test_short_payload() {
        let err = Pid::Rpm.decode(&[0x1A]).unwrap_err();
        assert_eq!(
            err,
            ObdError::ShortPayload {
                command: "010C".to_string(),
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_command_string() {
        let commands: Vec<String> = [
            Pid::SupportedPids,
            Pid::EngineLoad,
            Pid::CoolantTemp,
            Pid::Rpm,
            Pid::Speed,
            Pid::IntakeTemp,
            Pid::FuelLevel,
        ]
        .iter()
        .map(Pid::command)
        .collect();
        assert_eq!(commands, ["0100", "0104", "0105", "010C", "010D", "010F", "012F"]);
    }
}
