//! Straddle Poll Scheduler
//!
//! Runs the fetch → ingest → record → notify cycle at a fixed interval until
//! cancelled. Failed fetches skip the cycle.

mod scheduler;

pub use scheduler::{CycleResult, PollConfig, PollScheduler, PollStats};

use data_validator::ValidationError;
use thiserror::Error;

/// Scheduler errors
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Invalid poll config: {0}")]
    InvalidConfig(#[from] ValidationError),
}
