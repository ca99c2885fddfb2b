//! Brokerage Quote Protocol
//!
//! This crate provides the quote source abstraction used by the straddle
//! monitor, an async REST client for the Shoonya (Noren) brokerage API and a
//! deterministic mock source for running without a brokerage account.

mod client;
mod error;
mod mock;
mod source;

pub use client::{Credentials, ShoonyaClient, DEFAULT_HOST};
pub use error::QuoteError;
pub use mock::MockQuoteSource;
pub use source::{Quote, QuoteSource};

/// Exchange segment codes understood by the Noren API
pub mod exchange {
    /// NSE cash segment (indices and equities)
    pub const NSE: &str = "NSE";
    /// NSE futures and options segment
    pub const NFO: &str = "NFO";
}
