//! Premium Trailing Window
//!
//! Holds the per-cycle straddle `Reading` and the fixed-capacity FIFO window
//! of recent total premiums used for the moving average.

mod window;

pub use window::{TrailingWindow, MAX_CAPACITY};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One poll cycle's straddle snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub strike_price: f64,
    pub call_price: f64,
    pub put_price: f64,
    /// Call plus put
    pub total_premium: f64,
}

impl Reading {
    /// Build a reading; the total premium is derived from the two legs
    pub fn new(timestamp: DateTime<Utc>, strike_price: f64, call_price: f64, put_price: f64) -> Self {
        Self {
            timestamp,
            strike_price,
            call_price,
            put_price,
            total_premium: call_price + put_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_total_is_sum_of_legs() {
        let ts = Utc.with_ymd_and_hms(2025, 5, 15, 9, 30, 0).unwrap();
        let reading = Reading::new(ts, 24_500.0, 120.5, 98.25);
        assert_eq!(reading.total_premium, 218.75);
        assert_eq!(reading.strike_price, 24_500.0);
    }

    #[test]
    fn test_json_shape() {
        let ts = Utc.with_ymd_and_hms(2025, 5, 15, 9, 30, 0).unwrap();
        let json = serde_json::to_value(Reading::new(ts, 24_500.0, 100.0, 100.0)).unwrap();
        assert_eq!(json["total_premium"], 200.0);
        assert_eq!(json["timestamp"], "2025-05-15T09:30:00Z");
    }
}
