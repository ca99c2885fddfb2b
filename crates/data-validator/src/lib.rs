//! Data Validation
//!
//! Provides range checking for monitor settings and sanity checks for
//! quoted option and index prices.

mod error;
mod validator;

pub use error::ValidationError;
pub use validator::{ValidationConfig, Validator};
