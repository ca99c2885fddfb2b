//! ATM Strike Selection

/// Round the underlying price to the nearest strike on a `step` grid
///
/// Halfway prices round to the even multiple, so 24525 on a 50 grid
/// selects 24500 rather than 24550.
pub fn atm_strike(price: f64, step: f64) -> f64 {
    (price / step).round_ties_even() * step
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_strike() {
        assert_eq!(atm_strike(24_512.35, 50.0), 24_500.0);
        assert_eq!(atm_strike(24_537.0, 50.0), 24_550.0);
        assert_eq!(atm_strike(24_500.0, 50.0), 24_500.0);
    }

    #[test]
    fn test_halfway_rounds_to_even() {
        assert_eq!(atm_strike(24_525.0, 50.0), 24_500.0);
        assert_eq!(atm_strike(24_575.0, 50.0), 24_600.0);
    }

    #[test]
    fn test_other_grids() {
        assert_eq!(atm_strike(55_140.0, 100.0), 55_100.0);
    }
}
