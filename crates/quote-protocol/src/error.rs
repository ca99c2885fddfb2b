//! Quote Error Types

use thiserror::Error;

/// Errors that can occur while fetching quotes from a broker
#[derive(Debug, Error)]
pub enum QuoteError {
    /// Broker returned no quote for the instrument
    #[error("Quote unavailable for {exchange}:{symbol}: {reason}")]
    QuoteUnavailable {
        exchange: String,
        symbol: String,
        reason: String,
    },

    /// Transport level failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Response body could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Response decoded but a required field is absent
    #[error("Missing field in response: {0}")]
    MissingField(&'static str),

    /// Broker rejected the login request
    #[error("Login failed: {0}")]
    LoginFailed(String),

    /// Session token is no longer accepted
    #[error("Broker session expired")]
    SessionExpired,

    /// Quote requested before a successful login
    #[error("Not logged in to broker")]
    NotLoggedIn,
}

impl From<reqwest::Error> for QuoteError {
    fn from(err: reqwest::Error) -> Self {
        QuoteError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for QuoteError {
    fn from(err: serde_json::Error) -> Self {
        QuoteError::InvalidResponse(err.to_string())
    }
}
