//! Alerting System
//!
//! Provides the rolling-average alert monitor, the session alert log, and
//! notifiers invoked when a premium spike is detected.

mod monitor;
mod notifier;

pub use monitor::{AlertMonitor, AlertPoint, IngestOutcome, MonitorConfig};
pub use notifier::{AlertEvent, AlertNotifier, BellNotifier, CompositeNotifier, LogNotifier};

use data_validator::ValidationError;
use thiserror::Error;

/// Alerting errors
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("Invalid monitor config: {0}")]
    InvalidConfig(#[from] ValidationError),
    #[error("Trailing window is empty")]
    EmptyWindow,
}
