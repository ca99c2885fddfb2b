//! Validation Error Types

use thiserror::Error;

/// Errors during data validation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Value out of allowed range
    #[error("{field} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Price is NaN or infinite
    #[error("{field} price is not a finite number")]
    NonFinite { field: &'static str },

    /// Price is zero or negative
    #[error("{field} price {value} must be positive")]
    NonPositive { field: &'static str, value: f64 },
}
