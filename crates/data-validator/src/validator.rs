//! Range Checking

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive valid range for a reading. A missing bound is open.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl ValueRange {
    /// Any finite value
    pub const fn unbounded() -> Self {
        Self {
            min: None,
            max: None,
        }
    }

    /// `[min, ∞)`
    pub const fn at_least(min: f64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    /// `[min, max]`
    pub const fn between(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Whether `value` is finite and within both bounds
    pub fn contains(&self, value: f64) -> bool {
        value.is_finite()
            && self.min.map_or(true, |min| value >= min)
            && self.max.map_or(true, |max| value <= max)
    }

    /// Validate `value`, naming `field` in the error
    pub fn check(&self, field: &str, value: f64) -> Result<(), ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::NotFinite {
                field: field.to_string(),
                value,
            });
        }
        if self.contains(value) {
            Ok(())
        } else {
            Err(ValidationError::OutOfRange {
                field: field.to_string(),
                value,
                range: *self,
            })
        }
    }
}

impl Default for ValueRange {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl fmt::Display for ValueRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.min {
            Some(min) => write!(f, "[{min}, ")?,
            None => write!(f, "(-inf, ")?,
        }
        match self.max {
            Some(max) => write!(f, "{max}]"),
            None => write!(f, "inf)"),
        }
    }
}
