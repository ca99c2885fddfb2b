//! Data Validator for Range Checking

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Accepted ranges for the monitor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Trailing window size (log count)
    pub window_size_range: (f64, f64),
    /// Percentage increase that triggers an alert
    pub percentage_range: (f64, f64),
    /// Delay between poll cycles (seconds)
    pub poll_interval_range: (f64, f64),
    /// Points kept on the chart
    pub chart_points_range: (f64, f64),
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            window_size_range: (1.0, 500.0),
            percentage_range: (0.1, 100.0),
            poll_interval_range: (0.1, 60.0),
            chart_points_range: (10.0, 500.0),
        }
    }
}

/// Validator for settings and quoted prices
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    /// Create a new validator with given config
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate a single value against an inclusive range
    pub fn validate_range(
        &self,
        field: &'static str,
        value: f64,
        range: (f64, f64),
    ) -> Result<(), ValidationError> {
        if value.is_nan() || value < range.0 || value > range.1 {
            Err(ValidationError::OutOfRange {
                field,
                value,
                min: range.0,
                max: range.1,
            })
        } else {
            Ok(())
        }
    }

    /// Validate the trailing window size
    pub fn validate_window_size(&self, size: usize) -> Result<(), ValidationError> {
        self.validate_range("window_size", size as f64, self.config.window_size_range)
    }

    /// Validate the alert percentage
    pub fn validate_percentage(&self, percentage: f64) -> Result<(), ValidationError> {
        self.validate_range("percentage_increase", percentage, self.config.percentage_range)
    }

    /// Validate the poll interval
    pub fn validate_poll_interval(&self, seconds: f64) -> Result<(), ValidationError> {
        self.validate_range("poll_interval_secs", seconds, self.config.poll_interval_range)
    }

    /// Validate the number of chart points
    pub fn validate_chart_points(&self, points: usize) -> Result<(), ValidationError> {
        self.validate_range("max_chart_points", points as f64, self.config.chart_points_range)
    }

    /// Check that a quoted price is usable and return it
    pub fn validate_price(&self, field: &'static str, price: f64) -> Result<f64, ValidationError> {
        if !price.is_finite() {
            debug!("Rejected {} price: not finite", field);
            return Err(ValidationError::NonFinite { field });
        }
        if price <= 0.0 {
            debug!("Rejected {} price: {}", field, price);
            return Err(ValidationError::NonPositive { field, value: price });
        }
        Ok(price)
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}
