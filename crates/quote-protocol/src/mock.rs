//! Mock Quote Source
//!
//! Deterministic prices for demos and tests. Prices can be fixed per
//! instrument, defaulted per exchange, and scripted call by call.

use crate::error::QuoteError;
use crate::exchange;
use crate::source::{Quote, QuoteSource};
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::{debug, info};

/// NSE token of the NIFTY 50 index
const NIFTY_TOKEN: &str = "26000";

/// Mock quote source with optional pseudo-random jitter
pub struct MockQuoteSource {
    /// Base prices keyed by `EXCHANGE:SYMBOL`
    prices: HashMap<String, f64>,
    /// Fallback base price per exchange
    exchange_prices: HashMap<String, f64>,
    /// Max relative deviation applied to base prices (0.02 = ±2%)
    jitter: f64,
    /// Queued answers per instrument; `None` is a failed quote
    scripts: Mutex<HashMap<String, VecDeque<Option<f64>>>>,
    /// Quote counter, seeds the jitter
    calls: AtomicU64,
}

impl MockQuoteSource {
    /// Create an empty mock source (every quote is unavailable)
    pub fn new() -> Self {
        Self {
            prices: HashMap::new(),
            exchange_prices: HashMap::new(),
            jitter: 0.0,
            scripts: Mutex::new(HashMap::new()),
            calls: AtomicU64::new(0),
        }
    }

    /// Mock resembling a NIFTY weekly straddle
    pub fn nifty() -> Self {
        info!("Creating mock quote source for NIFTY straddle");
        Self::new()
            .with_price(exchange::NSE, NIFTY_TOKEN, 24_500.0)
            .with_exchange_price(exchange::NFO, 110.0)
            .with_jitter(0.02)
    }

    /// Fix the base price of one instrument
    pub fn with_price(mut self, exchange: &str, symbol: &str, price: f64) -> Self {
        self.prices.insert(key(exchange, symbol), price);
        self
    }

    /// Base price for any instrument on `exchange` without its own price
    pub fn with_exchange_price(mut self, exchange: &str, price: f64) -> Self {
        self.exchange_prices.insert(exchange.to_string(), price);
        self
    }

    /// Set relative jitter (0.0 disables)
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.max(0.0);
        self
    }

    /// Queue answers for an instrument, consumed one per quote
    pub fn script<I>(&self, exchange: &str, symbol: &str, answers: I)
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts
                .entry(key(exchange, symbol))
                .or_default()
                .extend(answers);
        }
    }

    /// Number of quotes served so far (including failures)
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    fn next_scripted(&self, key: &str) -> Result<Option<Option<f64>>, QuoteError> {
        let mut scripts = self
            .scripts
            .lock()
            .map_err(|e| QuoteError::InvalidResponse(format!("Lock error: {}", e)))?;
        Ok(scripts.get_mut(key).and_then(|queue| queue.pop_front()))
    }

    fn jittered(&self, key: &str, base: f64, call: u64) -> f64 {
        if self.jitter == 0.0 {
            return base;
        }

        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        call.hash(&mut hasher);
        let hash = hasher.finish();

        // Map into [-1.0, 1.0]
        let unit = (hash % 2001) as f64 / 1000.0 - 1.0;
        base * (1.0 + unit * self.jitter)
    }
}

impl Default for MockQuoteSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuoteSource for MockQuoteSource {
    async fn get_quote(&self, exchange: &str, symbol: &str) -> Result<Quote, QuoteError> {
        let key = key(exchange, symbol);
        let call = self.calls.fetch_add(1, Ordering::Relaxed);

        let unavailable = |reason: &str| QuoteError::QuoteUnavailable {
            exchange: exchange.to_string(),
            symbol: symbol.to_string(),
            reason: reason.to_string(),
        };

        if let Some(answer) = self.next_scripted(&key)? {
            debug!("Mock scripted quote for {}: {:?}", key, answer);
            return answer
                .map(|last_price| Quote { last_price })
                .ok_or_else(|| unavailable("scripted failure"));
        }

        let base = self
            .prices
            .get(&key)
            .or_else(|| self.exchange_prices.get(exchange))
            .copied()
            .ok_or_else(|| unavailable("unknown instrument"))?;

        Ok(Quote {
            last_price: self.jittered(&key, base, call),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

fn key(exchange: &str, symbol: &str) -> String {
    format!("{}:{}", exchange, symbol)
}
