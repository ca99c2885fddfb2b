//! Weekly Expiry Calculation

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Next `weekday` on or after `today`
pub fn weekly_expiry(today: NaiveDate, weekday: Weekday) -> NaiveDate {
    let target = weekday.num_days_from_monday();
    let current = today.weekday().num_days_from_monday();
    let days_until = (target + 7 - current) % 7;
    today + Duration::days(days_until as i64)
}

/// Expiry in trading-symbol form, e.g. `15MAY25`
pub fn format_expiry(date: NaiveDate) -> String {
    date.format("%d%b%y").to_string().to_uppercase()
}
