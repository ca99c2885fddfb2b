//! Poll Scheduler Implementation

use crate::SchedulerError;
use alerting::{AlertEvent, AlertMonitor, AlertNotifier, AlertPoint, IngestOutcome};
use chrono::{DateTime, Utc};
use data_validator::Validator;
use premium_window::Reading;
use quote_protocol::QuoteSource;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use storage::SessionLog;
use straddle::StraddleFetcher;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Configuration for the poll scheduler
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Delay between cycles in seconds (0.1-60.0, default: 1.0)
    pub interval_secs: f64,
    /// Notify on every alert rather than only when the premium first crosses
    pub repeat_notifications: bool,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: 1.0,
            repeat_notifications: true,
        }
    }
}

impl PollConfig {
    /// Check the interval against its accepted range
    pub fn validate(&self) -> Result<(), SchedulerError> {
        Validator::default().validate_poll_interval(self.interval_secs)?;
        Ok(())
    }

    /// Delay between cycles
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.interval_secs)
    }
}

/// Counters for one scheduler run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    pub cycles: u64,
    pub readings: u64,
    pub skipped: u64,
    pub alerts: u64,
}

/// What a single cycle did
#[derive(Debug, Clone)]
pub enum CycleResult {
    /// No reading this cycle
    Skipped { reason: String },
    /// Reading ingested into the monitor
    Ingested { reading: Reading, outcome: IngestOutcome },
}

/// Polls the straddle premium and feeds the alert monitor
pub struct PollScheduler {
    /// Configuration
    config: PollConfig,
    fetcher: StraddleFetcher,
    /// Session state, owned by the polling task alone
    monitor: AlertMonitor,
    notifier: Box<dyn AlertNotifier>,
    /// Timestamp source for readings
    clock: fn() -> DateTime<Utc>,
    stats: PollStats,
}

impl PollScheduler {
    /// Create a new poll scheduler
    pub fn new(
        config: PollConfig,
        fetcher: StraddleFetcher,
        monitor: AlertMonitor,
        notifier: Box<dyn AlertNotifier>,
    ) -> Result<Self, SchedulerError> {
        config.validate()?;
        info!("Poll scheduler created with {:.1}s interval", config.interval_secs);

        Ok(Self {
            config,
            fetcher,
            monitor,
            notifier,
            clock: Utc::now,
            stats: PollStats::default(),
        })
    }

    /// Override the timestamp source
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Run cycles until `shutdown` turns true or its sender is dropped
    ///
    /// The flag is checked once per cycle; the inter-cycle sleep ends early
    /// when it changes.
    pub async fn run(
        &mut self,
        source: &dyn QuoteSource,
        session: &SessionLog,
        mut shutdown: watch::Receiver<bool>,
    ) -> PollStats {
        info!("Starting poll scheduler using {} quotes", source.name());
        let interval = self.config.interval();

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.poll_once(source, session).await;

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        debug!("Shutdown sender dropped");
                        break;
                    }
                }
            }
        }

        info!(
            "Poll scheduler stopped: {} cycles, {} readings, {} skipped, {} alerts",
            self.stats.cycles, self.stats.readings, self.stats.skipped, self.stats.alerts
        );
        self.stats
    }

    /// Run one fetch → ingest → record → notify cycle
    pub async fn poll_once(&mut self, source: &dyn QuoteSource, session: &SessionLog) -> CycleResult {
        self.stats.cycles += 1;

        let reading = match self.fetcher.fetch(source, (self.clock)()).await {
            Ok(reading) => reading,
            Err(e) => return self.skip(e.to_string()),
        };

        let outcome = match self.monitor.ingest(&reading) {
            Ok(outcome) => outcome,
            Err(e) => return self.skip(e.to_string()),
        };

        self.stats.readings += 1;
        metrics::counter!("straddle_readings_total").increment(1);
        metrics::gauge!("straddle_total_premium").set(reading.total_premium);
        metrics::gauge!("straddle_window_average").set(outcome.average);

        info!(
            "{} | strike {} | CE {:.2} | PE {:.2} | total {:.2} | avg {:.2}",
            reading.timestamp.format("%H:%M:%S"),
            reading.strike_price,
            reading.call_price,
            reading.put_price,
            reading.total_premium,
            outcome.average
        );

        if let Err(e) = session.record(reading.clone()) {
            warn!("Failed to record reading: {}", e);
        }

        if outcome.is_alert {
            self.handle_alert(&reading, outcome, session);
        }

        CycleResult::Ingested { reading, outcome }
    }

    fn handle_alert(&mut self, reading: &Reading, outcome: IngestOutcome, session: &SessionLog) {
        self.stats.alerts += 1;
        metrics::counter!("straddle_alerts_total").increment(1);

        let event = AlertEvent {
            reading: reading.clone(),
            outcome,
            window_size: self.monitor.config().window_size,
        };

        let point = AlertPoint {
            timestamp: reading.timestamp,
            total_premium: reading.total_premium,
        };
        if let Err(e) = session.record_alert(point, event.message()) {
            warn!("Failed to record alert: {}", e);
        }

        if self.config.repeat_notifications || outcome.rising_edge {
            self.notifier.notify(&event);
        } else {
            debug!("Premium still above threshold, notification suppressed");
        }
    }

    fn skip(&mut self, reason: String) -> CycleResult {
        self.stats.skipped += 1;
        metrics::counter!("straddle_fetch_failures_total").increment(1);
        warn!("Skipping cycle {}: {}", self.stats.cycles, reason);
        CycleResult::Skipped { reason }
    }

    /// The alert monitor
    pub fn monitor(&self) -> &AlertMonitor {
        &self.monitor
    }

    /// Counters so far
    pub fn stats(&self) -> PollStats {
        self.stats
    }
}
