//! Alert Monitor Implementation

use crate::AlertError;
use chrono::{DateTime, Utc};
use data_validator::Validator;
use premium_window::{Reading, TrailingWindow};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Alert monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Number of recent premiums averaged (1-500, default: 10)
    pub window_size: usize,
    /// Percentage above the average that triggers an alert (0.1-100.0, default: 1.0)
    pub percentage_increase: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            percentage_increase: 1.0,
        }
    }
}

impl MonitorConfig {
    /// Check both values against their accepted ranges
    pub fn validate(&self) -> Result<(), AlertError> {
        let validator = Validator::default();
        validator.validate_window_size(self.window_size)?;
        validator.validate_percentage(self.percentage_increase)?;
        Ok(())
    }

    /// Multiplier applied to the average, e.g. 1.05 for 5%
    pub fn threshold_factor(&self) -> f64 {
        1.0 + self.percentage_increase / 100.0
    }
}

/// A reading that crossed the threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertPoint {
    pub timestamp: DateTime<Utc>,
    pub total_premium: f64,
}

/// Result of ingesting one reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IngestOutcome {
    /// Window mean, including the reading just pushed
    pub average: f64,
    /// Average scaled by the configured percentage
    pub threshold: f64,
    /// Premium reached the threshold
    pub is_alert: bool,
    /// Alert following a reading that was below threshold
    pub rising_edge: bool,
    /// Premium relative to the average, in percent
    pub increase_pct: f64,
    /// Window length after the push
    pub window_len: usize,
}

/// Rolling-average spike detector holding all per-session state
pub struct AlertMonitor {
    /// Configuration
    config: MonitorConfig,
    /// Recent total premiums
    window: TrailingWindow,
    /// Every alert of the session, oldest first
    alert_log: Vec<AlertPoint>,
    /// Whether the last reading was at or above threshold
    above_threshold: bool,
}

impl AlertMonitor {
    /// Create a new alert monitor
    pub fn new(config: MonitorConfig) -> Result<Self, AlertError> {
        config.validate()?;
        info!("Creating alert monitor with config: {:?}", config);
        Ok(Self {
            window: TrailingWindow::new(config.window_size),
            config,
            alert_log: Vec::new(),
            above_threshold: false,
        })
    }

    /// Push the reading's premium and test it against the window average
    pub fn ingest(&mut self, reading: &Reading) -> Result<IngestOutcome, AlertError> {
        let premium = reading.total_premium;

        if let Some(evicted) = self.window.push(premium) {
            debug!("Evicted premium {:.2} from window", evicted);
        }

        let average = self.window.mean().ok_or(AlertError::EmptyWindow)?;
        let threshold = average * self.config.threshold_factor();
        let is_alert = premium >= threshold;
        let rising_edge = is_alert && !self.above_threshold;
        let increase_pct = if average != 0.0 {
            (premium - average) / average * 100.0
        } else {
            0.0
        };

        if is_alert {
            self.alert_log.push(AlertPoint {
                timestamp: reading.timestamp,
                total_premium: premium,
            });
            info!(
                "Premium {:.2} >= threshold {:.2} (avg {:.2}, +{:.2}%)",
                premium, threshold, average, increase_pct
            );
        } else {
            debug!(
                "Premium {:.2} below threshold {:.2} (avg {:.2})",
                premium, threshold, average
            );
        }
        self.above_threshold = is_alert;

        Ok(IngestOutcome {
            average,
            threshold,
            is_alert,
            rising_edge,
            increase_pct,
            window_len: self.window.len(),
        })
    }

    /// All alerts recorded this session
    pub fn alert_log(&self) -> &[AlertPoint] {
        &self.alert_log
    }

    /// Current trailing window
    pub fn window(&self) -> &TrailingWindow {
        &self.window
    }

    /// Whether the most recent reading alerted
    pub fn above_threshold(&self) -> bool {
        self.above_threshold
    }

    /// Get the configuration
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }
}
