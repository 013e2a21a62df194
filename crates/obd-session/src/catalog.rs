//! Command catalog: what each diagnostic command sends, how its reply is
//! decoded and which values are physically plausible.

use data_validator::{ValidationError, ValueRange};
use obd_protocol::{decode_dtc_payload, mode, Pid, RawDtc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Identifier of a catalog command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandId {
    Rpm,
    Speed,
    CoolantTemp,
    IntakeTemp,
    FuelLevel,
    EngineLoad,
    GetDtc,
    ClearDtc,
}

impl CommandId {
    /// Sensor commands in snapshot order
    pub const SENSORS: [CommandId; 6] = [
        CommandId::Rpm,
        CommandId::Speed,
        CommandId::CoolantTemp,
        CommandId::IntakeTemp,
        CommandId::FuelLevel,
        CommandId::EngineLoad,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CommandId::Rpm => "RPM",
            CommandId::Speed => "SPEED",
            CommandId::CoolantTemp => "COOLANT_TEMP",
            CommandId::IntakeTemp => "INTAKE_TEMP",
            CommandId::FuelLevel => "FUEL_LEVEL",
            CommandId::EngineLoad => "ENGINE_LOAD",
            CommandId::GetDtc => "GET_DTC",
            CommandId::ClearDtc => "CLEAR_DTC",
        }
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoded result of one command
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Sensor reading in the command's unit
    Scalar(f64),
    /// Trouble codes as reported by the adapter
    Codes(Vec<RawDtc>),
    /// Positive acknowledgement with no data
    Ack,
}

impl Value {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(v) => Some(*v),
            _ => None,
        }
    }
}

/// Reply payload (bytes after the SID/PID echo) to value
pub type DecodeFn = fn(&[u8]) -> Result<Value, String>;

/// One catalog entry
#[derive(Clone)]
pub struct CommandSpec {
    pub id: CommandId,
    /// Command sent to the adapter, e.g. `010C`
    pub command: String,
    pub decode: DecodeFn,
    /// Inclusive valid range for scalar values; `None` for non-numeric commands
    pub range: Option<ValueRange>,
    pub unit: &'static str,
}

impl CommandSpec {
    pub fn new(
        id: CommandId,
        command: impl Into<String>,
        decode: DecodeFn,
        range: Option<ValueRange>,
        unit: &'static str,
    ) -> Self {
        Self {
            id,
            command: command.into(),
            decode,
            range,
            unit,
        }
    }

    /// Range-check a decoded value. Non-scalar values always pass.
    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        match (value, &self.range) {
            (Value::Scalar(v), Some(range)) => range.check(self.id.name(), *v),
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("id", &self.id)
            .field("command", &self.command)
            .field("range", &self.range)
            .field("unit", &self.unit)
            .finish_non_exhaustive()
    }
}

fn sensor(id: CommandId, pid: Pid, decode: DecodeFn, range: ValueRange, unit: &'static str) -> CommandSpec {
    CommandSpec::new(id, pid.command(), decode, Some(range), unit)
}

fn scalar(pid: Pid, bytes: &[u8]) -> Result<Value, String> {
    pid.decode(bytes).map(Value::Scalar).map_err(|e| e.to_string())
}

fn decode_codes(bytes: &[u8]) -> Result<Value, String> {
    Ok(Value::Codes(decode_dtc_payload(bytes)))
}

fn decode_ack(_bytes: &[u8]) -> Result<Value, String> {
    Ok(Value::Ack)
}

/// Read-only table of supported commands, shared by `Arc` once built
#[derive(Debug, Clone)]
pub struct CommandCatalog {
    specs: HashMap<CommandId, CommandSpec>,
}

impl CommandCatalog {
    /// The standard Mode 01/03/04 command set
    pub fn standard() -> Self {
        Self::from_specs([
            sensor(CommandId::Rpm, Pid::Rpm, |b| scalar(Pid::Rpm, b), ValueRange::at_least(0.0), "rpm"),
            sensor(CommandId::Speed, Pid::Speed, |b| scalar(Pid::Speed, b), ValueRange::at_least(0.0), "km/h"),
            sensor(
                CommandId::CoolantTemp,
                Pid::CoolantTemp,
                |b| scalar(Pid::CoolantTemp, b),
                ValueRange::unbounded(),
                "°C",
            ),
            sensor(
                CommandId::IntakeTemp,
                Pid::IntakeTemp,
                |b| scalar(Pid::IntakeTemp, b),
                ValueRange::unbounded(),
                "°C",
            ),
            sensor(
                CommandId::FuelLevel,
                Pid::FuelLevel,
                |b| scalar(Pid::FuelLevel, b),
                ValueRange::between(0.0, 100.0),
                "%",
            ),
            sensor(
                CommandId::EngineLoad,
                Pid::EngineLoad,
                |b| scalar(Pid::EngineLoad, b),
                ValueRange::between(0.0, 100.0),
                "%",
            ),
            CommandSpec::new(CommandId::GetDtc, format!("{:02X}", mode::READ_DTC), decode_codes, None, ""),
            CommandSpec::new(CommandId::ClearDtc, format!("{:02X}", mode::CLEAR_DTC), decode_ack, None, ""),
        ])
    }

    /// Build from arbitrary entries; a later entry replaces an earlier one
    /// with the same id.
    pub fn from_specs(specs: impl IntoIterator<Item = CommandSpec>) -> Self {
        Self {
            specs: specs.into_iter().map(|spec| (spec.id, spec)).collect(),
        }
    }

    /// Replace (or add) one entry
    pub fn with_spec(mut self, spec: CommandSpec) -> Self {
        self.specs.insert(spec.id, spec);
        self
    }

    pub fn get(&self, id: CommandId) -> Option<&CommandSpec> {
        self.specs.get(&id)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl Default for CommandCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
