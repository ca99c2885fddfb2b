//! Trailing Window Implementation

use std::collections::VecDeque;

/// Largest window the monitor accepts (last 500 logs)
pub const MAX_CAPACITY: usize = 500;

/// Fixed-capacity FIFO of the most recent total premiums
#[derive(Debug, Clone)]
pub struct TrailingWindow {
    /// Oldest value at the front
    values: VecDeque<f64>,
    /// Maximum number of values held
    capacity: usize,
}

impl TrailingWindow {
    /// Create a new window holding at most `capacity` values
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Window capacity must be > 0");
        Self {
            values: VecDeque::with_capacity(capacity.min(MAX_CAPACITY)),
            capacity,
        }
    }

    /// Push a value, returning the evicted oldest value if the window overflowed
    pub fn push(&mut self, value: f64) -> Option<f64> {
        self.values.push_back(value);

        if self.values.len() > self.capacity {
            self.values.pop_front()
        } else {
            None
        }
    }

    /// Arithmetic mean of the values currently held, `None` when empty
    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }

    /// Get the number of values currently held
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if window is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Check if window is full
    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }
}
