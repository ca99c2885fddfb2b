//! ATM Straddle Resolution
//!
//! Turns an underlying index quote into the at-the-money call/put pair for
//! the current weekly expiry and sums their last prices into a `Reading`.

mod expiry;
mod fetcher;
mod master;
mod strike;
mod symbol;

pub use expiry::{format_expiry, weekly_expiry};
pub use fetcher::{InstrumentConfig, StraddleFetcher};
pub use master::{OptionContract, SymbolMaster};
pub use strike::atm_strike;
pub use symbol::{option_symbol, OptionKind, StraddleLegs};

use chrono::NaiveDate;
use data_validator::ValidationError;
use quote_protocol::QuoteError;
use thiserror::Error;

/// Straddle resolution errors
#[derive(Debug, Error)]
pub enum StraddleError {
    #[error(transparent)]
    Quote(#[from] QuoteError),
    #[error("Rejected price: {0}")]
    InvalidPrice(#[from] ValidationError),
    #[error("No CE/PE pair at strike {strike} expiring on or after {date}")]
    NoContract { strike: f64, date: NaiveDate },
    #[error("Symbol master error: {0}")]
    SymbolMaster(String),
    #[error("Invalid instrument config: {0}")]
    InvalidConfig(String),
}

impl From<csv::Error> for StraddleError {
    fn from(err: csv::Error) -> Self {
        StraddleError::SymbolMaster(err.to_string())
    }
}

impl From<std::io::Error> for StraddleError {
    fn from(err: std::io::Error) -> Self {
        StraddleError::SymbolMaster(err.to_string())
    }
}

impl From<zip::result::ZipError> for StraddleError {
    fn from(err: zip::result::ZipError) -> Self {
        StraddleError::SymbolMaster(err.to_string())
    }
}

impl From<reqwest::Error> for StraddleError {
    fn from(err: reqwest::Error) -> Self {
        StraddleError::SymbolMaster(err.to_string())
    }
}
