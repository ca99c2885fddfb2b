//! Option Trading Symbols

use serde::{Deserialize, Serialize};

/// Option right
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionKind {
    Call,
    Put,
}

impl OptionKind {
    /// Letter used inside trading symbols
    pub fn symbol_code(&self) -> char {
        match self {
            OptionKind::Call => 'C',
            OptionKind::Put => 'P',
        }
    }

    /// Parse the symbol master `OptionType` column
    pub fn from_master_code(code: &str) -> Option<Self> {
        match code.trim() {
            "CE" => Some(OptionKind::Call),
            "PE" => Some(OptionKind::Put),
            _ => None,
        }
    }
}

/// Quote identifiers for both legs of a straddle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StraddleLegs {
    /// Expiry label, e.g. `15MAY25`
    pub expiry: String,
    pub call: String,
    pub put: String,
}

/// Build a trading symbol such as `NIFTY15MAY25C24500`
pub fn option_symbol(root: &str, expiry: &str, kind: OptionKind, strike: f64) -> String {
    format!("{}{}{}{}", root, expiry, kind.symbol_code(), strike.round() as i64)
}
