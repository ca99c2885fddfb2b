//! Quote Source Abstraction

use crate::error::QuoteError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Last traded price snapshot for one instrument
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub last_price: f64,
}

/// Anything that can answer `get_quote(exchange, symbol)`
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Fetch the latest quote for `symbol` on `exchange`
    async fn get_quote(&self, exchange: &str, symbol: &str) -> Result<Quote, QuoteError>;

    /// Short name used in logs
    fn name(&self) -> &str;
}
