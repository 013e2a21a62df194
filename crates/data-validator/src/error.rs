//! Validation Error Types

use thiserror::Error;

use crate::validator::ValueRange;

/// Errors during data validation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Value out of allowed range
    #[error("{field} value {value} is out of range {range}")]
    OutOfRange {
        field: String,
        value: f64,
        range: ValueRange,
    },

    /// NaN or infinite value
    #[error("{field} value {value} is not a finite number")]
    NotFinite { field: String, value: f64 },
}
