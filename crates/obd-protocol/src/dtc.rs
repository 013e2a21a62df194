//! Diagnostic trouble code decoding (Mode 03) and the generic code table.

use serde::{Deserialize, Serialize};

/// A trouble code as reported by the adapter: the code and, when the code is
/// in the generic table, its description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDtc {
    pub code: String,
    pub description: Option<String>,
}

impl RawDtc {
    pub fn new(code: impl Into<String>, description: Option<&str>) -> Self {
        Self {
            code: code.into(),
            description: description.map(str::to_string),
        }
    }
}

/// Decode two raw bytes into a standard DTC code string (e.g., "P0300").
///
/// `00 00` is padding and yields `None`.
pub fn decode_dtc_bytes(b1: u8, b2: u8) -> Option<String> {
    if b1 == 0x00 && b2 == 0x00 {
        return None;
    }

    let category = match (b1 >> 6) & 0x03 {
        0 => 'P',
        1 => 'C',
        2 => 'B',
        _ => 'U',
    };
    let digit1 = (b1 >> 4) & 0x03;
    let digit2 = b1 & 0x0F;
    let digit3 = (b2 >> 4) & 0x0F;
    let digit4 = b2 & 0x0F;

    Some(format!("{category}{digit1}{digit2:X}{digit3:X}{digit4:X}"))
}

/// Decode a Mode 03 payload (byte pairs after the `43` SID) into codes with
/// descriptions. A trailing odd byte is ignored.
pub fn decode_dtc_payload(payload: &[u8]) -> Vec<RawDtc> {
    payload
        .chunks_exact(2)
        .filter_map(|pair| decode_dtc_bytes(pair[0], pair[1]))
        .map(|code| {
            let description = describe(&code);
            RawDtc::new(code, description)
        })
        .collect()
}

/// Look up a generic (SAE J2012) code. Case-insensitive.
pub fn describe(code: &str) -> Option<&'static str> {
    let code = code.to_ascii_uppercase();
    let description = match code.as_str() {
        // Fuel and air metering
        "P0100" => "Mass or Volume Air Flow Circuit Malfunction",
        "P0101" => "Mass or Volume Air Flow Circuit Range/Performance",
        "P0102" => "Mass or Volume Air Flow Circuit Low Input",
        "P0103" => "Mass or Volume Air Flow Circuit High Input",
        "P0110" => "Intake Air Temperature Circuit Malfunction",
        "P0112" => "Intake Air Temperature Circuit Low Input",
        "P0113" => "Intake Air Temperature Circuit High Input",
        "P0115" => "Engine Coolant Temperature Circuit Malfunction",
        "P0116" => "Engine Coolant Temperature Circuit Range/Performance",
        "P0117" => "Engine Coolant Temperature Circuit Low Input",
        "P0118" => "Engine Coolant Temperature Circuit High Input",
        "P0120" => "Throttle Position Sensor Circuit Malfunction",
        "P0128" => "Coolant Thermostat Below Regulating Temperature",
        "P0130" => "O2 Sensor Circuit Malfunction (Bank 1, Sensor 1)",
        "P0133" => "O2 Sensor Circuit Slow Response (Bank 1, Sensor 1)",
        "P0171" => "System Too Lean (Bank 1)",
        "P0172" => "System Too Rich (Bank 1)",
        "P0174" => "System Too Lean (Bank 2)",
        "P0175" => "System Too Rich (Bank 2)",
        // Ignition system and misfire
        "P0300" => "Random/Multiple Cylinder Misfire Detected",
        "P0301" => "Cylinder 1 Misfire Detected",
        "P0302" => "Cylinder 2 Misfire Detected",
        "P0303" => "Cylinder 3 Misfire Detected",
        "P0304" => "Cylinder 4 Misfire Detected",
        "P0305" => "Cylinder 5 Misfire Detected",
        "P0306" => "Cylinder 6 Misfire Detected",
        "P0325" => "Knock Sensor 1 Circuit Malfunction (Bank 1)",
        "P0335" => "Crankshaft Position Sensor A Circuit Malfunction",
        "P0340" => "Camshaft Position Sensor Circuit Malfunction",
        // Emission controls
        "P0401" => "Exhaust Gas Recirculation Flow Insufficient Detected",
        "P0420" => "Catalyst System Efficiency Below Threshold (Bank 1)",
        "P0430" => "Catalyst System Efficiency Below Threshold (Bank 2)",
        "P0440" => "Evaporative Emission Control System Malfunction",
        "P0442" => "Evaporative Emission Control System Leak Detected (small leak)",
        "P0455" => "Evaporative Emission Control System Leak Detected (gross leak)",
        "P0456" => "Evaporative Emission Control System Leak Detected (very small leak)",
        // Speed, idle control and auxiliary inputs
        "P0500" => "Vehicle Speed Sensor Malfunction",
        "P0505" => "Idle Control System Malfunction",
        "P0562" => "System Voltage Low",
        "P0563" => "System Voltage High",
        // Computer and transmission
        "P0601" => "Internal Control Module Memory Check Sum Error",
        "P0700" => "Transmission Control System Malfunction",
        // Network
        "U0001" => "High Speed CAN Communication Bus",
        "U0100" => "Lost Communication With ECM/PCM A",
        "U0101" => "Lost Communication With TCM",
        "U0121" => "Lost Communication With Anti-Lock Brake System (ABS) Control Module",
        _ => return None,
    };
    Some(description)
}
