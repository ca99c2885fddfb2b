//! Alert Notifiers

use crate::monitor::IngestOutcome;
use premium_window::Reading;
use std::io::Write;
use tracing::{debug, warn};

/// Everything a notifier needs to describe an alert
#[derive(Debug, Clone)]
pub struct AlertEvent {
    pub reading: Reading,
    pub outcome: IngestOutcome,
    /// Configured log count the average covers
    pub window_size: usize,
}

impl AlertEvent {
    /// Human readable alert text
    pub fn message(&self) -> String {
        format!(
            "Total premium increased by {:.2}% over the last {} logs! (Avg: {:.2}, Current: {:.2})",
            self.outcome.increase_pct,
            self.window_size,
            self.outcome.average,
            self.reading.total_premium
        )
    }
}

/// Receives alerts from the polling loop
pub trait AlertNotifier: Send + Sync {
    fn notify(&self, event: &AlertEvent);
}

/// Writes alerts to the log
#[derive(Debug, Default)]
pub struct LogNotifier;

impl AlertNotifier for LogNotifier {
    fn notify(&self, event: &AlertEvent) {
        warn!(
            alert_time = %event.reading.timestamp.format("%H:%M:%S"),
            "{}",
            event.message()
        );
    }
}

/// Rings the terminal bell when sound is enabled
#[derive(Debug)]
pub struct BellNotifier {
    enabled: bool,
}

impl BellNotifier {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl AlertNotifier for BellNotifier {
    fn notify(&self, _event: &AlertEvent) {
        if !self.enabled {
            return;
        }
        let mut stdout = std::io::stdout();
        if let Err(e) = stdout.write_all(b"\x07").and_then(|_| stdout.flush()) {
            debug!("Failed to ring bell: {}", e);
        }
    }
}

/// Fans an alert out to several notifiers, in order
#[derive(Default)]
pub struct CompositeNotifier {
    notifiers: Vec<Box<dyn AlertNotifier>>,
}

impl CompositeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, notifier: impl AlertNotifier + 'static) -> Self {
        self.notifiers.push(Box::new(notifier));
        self
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

impl AlertNotifier for CompositeNotifier {
    fn notify(&self, event: &AlertEvent) {
        for notifier in &self.notifiers {
            notifier.notify(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting(Arc<AtomicUsize>);

    impl AlertNotifier for Counting {
        fn notify(&self, _event: &AlertEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn event() -> AlertEvent {
        let ts = Utc.with_ymd_and_hms(2025, 5, 15, 10, 0, 0).unwrap();
        AlertEvent {
            reading: Reading::new(ts, 24_500.0, 60.0, 50.0),
            outcome: IngestOutcome {
                average: 103.33,
                threshold: 108.5,
                is_alert: true,
                rising_edge: true,
                increase_pct: 6.45,
                window_len: 3,
            },
            window_size: 3,
        }
    }

    #[test]
    fn test_message_format() {
        assert_eq!(
            event().message(),
            "Total premium increased by 6.45% over the last 3 logs! (Avg: 103.33, Current: 110.00)"
        );
    }

    #[test]
    fn test_composite_fans_out() {
        let count = Arc::new(AtomicUsize::new(0));
        let composite = CompositeNotifier::new()
            .with(Counting(count.clone()))
            .with(LogNotifier)
            .with(Counting(count.clone()));

        assert_eq!(composite.len(), 3);
        composite.notify(&event());
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_disabled_bell_is_silent() {
        let bell = BellNotifier::new(false);
        assert!(!bell.is_enabled());
        bell.notify(&event());
    }
}
