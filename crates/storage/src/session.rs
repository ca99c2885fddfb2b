//! Session Log Implementation

use crate::StorageError;
use alerting::AlertPoint;
use chrono::{DateTime, Duration, Utc};
use premium_window::Reading;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::{debug, info};

/// Default retention (a full trading day at 1 s intervals, with headroom)
const DEFAULT_MAX_READINGS: usize = 100_000;

/// Data behind the live chart
#[derive(Debug, Clone, Serialize)]
pub struct ChartSnapshot {
    /// Charted readings, oldest first
    pub points: Vec<Reading>,
    /// Most recent total premium
    pub latest_premium: f64,
    /// Mean of the last `window` charted premiums
    pub average: f64,
    /// Log count the average covers
    pub window: usize,
    /// Alerts inside the charted time range
    pub alerts: Vec<AlertPoint>,
}

/// Recent alert shown as a transient banner
#[derive(Debug, Clone, Serialize)]
pub struct AlertBanner {
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub total_premium: f64,
}

#[derive(Debug, Clone)]
struct AlertEntry {
    point: AlertPoint,
    message: String,
}

/// Session history shared between the poller and the dashboard
pub struct SessionLog {
    /// Readings, oldest first
    readings: Mutex<VecDeque<Reading>>,
    /// Alerts, oldest first
    alerts: Mutex<Vec<AlertEntry>>,
    /// Max readings retained
    max_readings: usize,
}

impl SessionLog {
    /// Create an empty session log
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_MAX_READINGS)
    }

    /// Create a session log keeping at most `max_readings` readings
    pub fn with_retention(max_readings: usize) -> Self {
        info!("Creating session log (retention {} readings)", max_readings);
        Self {
            readings: Mutex::new(VecDeque::with_capacity(max_readings.min(10_000))),
            alerts: Mutex::new(Vec::new()),
            max_readings: max_readings.max(1),
        }
    }

    /// Append a reading
    pub fn record(&self, reading: Reading) -> Result<(), StorageError> {
        let mut readings = self.lock_readings()?;

        // Enforce retention
        while readings.len() >= self.max_readings {
            readings.pop_front();
        }

        readings.push_back(reading);
        Ok(())
    }

    /// Append an alert point with its display message
    pub fn record_alert(&self, point: AlertPoint, message: String) -> Result<(), StorageError> {
        let mut alerts = self.lock_alerts()?;
        debug!("Recording alert at {}", point.timestamp);
        alerts.push(AlertEntry { point, message });
        Ok(())
    }

    /// Most recent readings, newest first
    pub fn recent(&self, limit: usize) -> Result<Vec<Reading>, StorageError> {
        let readings = self.lock_readings()?;
        Ok(readings.iter().rev().take(limit).cloned().collect())
    }

    /// Every retained reading, oldest first
    pub fn all_readings(&self) -> Result<Vec<Reading>, StorageError> {
        Ok(self.lock_readings()?.iter().cloned().collect())
    }

    /// Latest reading
    pub fn latest(&self) -> Result<Reading, StorageError> {
        self.lock_readings()?.back().cloned().ok_or(StorageError::NoData)
    }

    /// Most recent alerts, newest first
    pub fn alerts(&self, limit: usize) -> Result<Vec<AlertPoint>, StorageError> {
        let alerts = self.lock_alerts()?;
        Ok(alerts.iter().rev().take(limit).map(|a| a.point.clone()).collect())
    }

    /// Chart of the last `max_points` readings with the average of the last `window`
    pub fn chart(&self, max_points: usize, window: usize) -> Result<ChartSnapshot, StorageError> {
        let points: Vec<Reading> = {
            let readings = self.lock_readings()?;
            let skip = readings.len().saturating_sub(max_points);
            readings.iter().skip(skip).cloned().collect()
        };

        let (first, last) = match (points.first(), points.last()) {
            (Some(first), Some(last)) => (first.timestamp, last.clone()),
            _ => return Err(StorageError::NoData),
        };

        let tail = &points[points.len().saturating_sub(window.max(1))..];
        let average = tail.iter().map(|r| r.total_premium).sum::<f64>() / tail.len() as f64;

        let alerts = self
            .lock_alerts()?
            .iter()
            .filter(|a| a.point.timestamp >= first && a.point.timestamp <= last.timestamp)
            .map(|a| a.point.clone())
            .collect();

        Ok(ChartSnapshot {
            latest_premium: last.total_premium,
            average,
            window,
            alerts,
            points,
        })
    }

    /// Latest alert if it is younger than `ttl`
    pub fn active_banner(
        &self,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Option<AlertBanner>, StorageError> {
        let alerts = self.lock_alerts()?;
        Ok(alerts
            .last()
            .filter(|a| now - a.point.timestamp <= ttl)
            .map(|a| AlertBanner {
                message: a.message.clone(),
                timestamp: a.point.timestamp,
                total_premium: a.point.total_premium,
            }))
    }

    /// Get total reading count
    pub fn reading_count(&self) -> usize {
        self.readings.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Get total alert count
    pub fn alert_count(&self) -> usize {
        self.alerts.lock().map(|a| a.len()).unwrap_or(0)
    }

    fn lock_readings(&self) -> Result<std::sync::MutexGuard<'_, VecDeque<Reading>>, StorageError> {
        self.readings
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))
    }

    fn lock_alerts(&self) -> Result<std::sync::MutexGuard<'_, Vec<AlertEntry>>, StorageError> {
        self.alerts
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))
    }
}

impl Default for SessionLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(second: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 15, 9, 15, 0).unwrap() + Duration::seconds(second)
    }

    fn reading(second: i64, premium: f64) -> Reading {
        Reading::new(at(second), 24_500.0, premium / 2.0, premium / 2.0)
    }

    #[test]
    fn test_record_and_recent() {
        let log = SessionLog::new();
        assert!(matches!(log.latest(), Err(StorageError::NoData)));

        for i in 0..5 {
            log.record(reading(i, 100.0 + i as f64)).unwrap();
        }

        let recent = log.recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].total_premium, 104.0);
        assert_eq!(recent[1].total_premium, 103.0);
        assert_eq!(log.latest().unwrap().total_premium, 104.0);
        assert_eq!(log.reading_count(), 5);
    }

    #[test]
    fn test_retention_limit() {
        let log = SessionLog::with_retention(3);
        for i in 0..10 {
            log.record(reading(i, i as f64 + 1.0)).unwrap();
        }
        let all = log.all_readings().unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].total_premium, 8.0);
    }

    #[test]
    fn test_chart_window_and_alert_range() {
        let log = SessionLog::new();
        for i in 0..20 {
            log.record(reading(i, 100.0 + i as f64)).unwrap();
        }
        log.record_alert(
            AlertPoint { timestamp: at(2), total_premium: 102.0 },
            "old".to_string(),
        )
        .unwrap();
        log.record_alert(
            AlertPoint { timestamp: at(18), total_premium: 118.0 },
            "recent".to_string(),
        )
        .unwrap();

        let chart = log.chart(10, 4).unwrap();
        assert_eq!(chart.points.len(), 10);
        assert_eq!(chart.points[0].total_premium, 110.0);
        assert_eq!(chart.latest_premium, 119.0);
        // Mean of 116..=119
        assert!((chart.average - 117.5).abs() < 1e-9);
        assert_eq!(chart.alerts.len(), 1);
        assert_eq!(chart.alerts[0].total_premium, 118.0);
    }

    #[test]
    fn test_chart_window_larger_than_points() {
        let log = SessionLog::new();
        log.record(reading(0, 100.0)).unwrap();
        log.record(reading(1, 200.0)).unwrap();

        let chart = log.chart(100, 10).unwrap();
        assert_eq!(chart.points.len(), 2);
        assert!((chart.average - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_chart() {
        assert!(matches!(SessionLog::new().chart(100, 10), Err(StorageError::NoData)));
    }

    #[test]
    fn test_banner_expires() {
        let log = SessionLog::new();
        assert!(log.active_banner(at(0), Duration::seconds(5)).unwrap().is_none());

        log.record_alert(
            AlertPoint { timestamp: at(10), total_premium: 150.0 },
            "spike".to_string(),
        )
        .unwrap();

        let banner = log.active_banner(at(13), Duration::seconds(5)).unwrap().unwrap();
        assert_eq!(banner.message, "spike");
        assert!(log.active_banner(at(16), Duration::seconds(5)).unwrap().is_none());
        assert_eq!(log.alert_count(), 1);
        assert_eq!(log.alerts(10).unwrap()[0].total_premium, 150.0);
    }
}
