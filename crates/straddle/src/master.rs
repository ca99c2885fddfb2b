//! Symbol Master Parsing
//!
//! Shoonya publishes its F&O contract list as a pipe-delimited text file
//! (`NFO_symbols.txt`, distributed zipped). This module downloads and unpacks
//! the archive or reads an extracted copy, then finds the nearest-expiry
//! call/put pair for a strike.

use crate::symbol::{OptionKind, StraddleLegs};
use crate::StraddleError;
use crate::format_expiry;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const EXPIRY_FORMAT: &str = "%d-%b-%Y";

/// Timeout for the symbol master download (the archive is several MB)
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct MasterRow {
    #[serde(rename = "Token")]
    token: String,
    #[serde(rename = "Symbol")]
    symbol: String,
    #[serde(rename = "TradingSymbol")]
    trading_symbol: String,
    #[serde(rename = "Expiry")]
    expiry: String,
    #[serde(rename = "Instrument")]
    instrument: String,
    #[serde(rename = "OptionType")]
    option_type: String,
    #[serde(rename = "StrikePrice")]
    strike_price: String,
}

/// One listed option contract
#[derive(Debug, Clone, PartialEq)]
pub struct OptionContract {
    pub token: String,
    pub trading_symbol: String,
    pub expiry: NaiveDate,
    pub kind: OptionKind,
    pub strike: f64,
}

/// Option contracts of one underlying, loaded from the symbol master
#[derive(Debug, Clone, Default)]
pub struct SymbolMaster {
    contracts: Vec<OptionContract>,
}

impl SymbolMaster {
    /// Load options on `root` from a symbol master file
    pub fn from_path(path: impl AsRef<Path>, root: &str) -> Result<Self, StraddleError> {
        let path = path.as_ref();
        info!("Loading symbol master from {}", path.display());
        let file = File::open(path)?;
        Self::from_reader(file, root)
    }

    /// Download a zipped symbol master and load options on `root`
    pub async fn download(url: &str, root: &str) -> Result<Self, StraddleError> {
        info!("Downloading symbol master from {}", url);

        let http = reqwest::Client::builder().timeout(DOWNLOAD_TIMEOUT).build()?;
        let bytes = http.get(url).send().await?.error_for_status()?.bytes().await?;
        debug!("Symbol master archive is {} bytes", bytes.len());

        Self::from_zip(&bytes, root)
    }

    /// Load options on `root` from the first `.txt` entry of a zip archive
    pub fn from_zip(archive: &[u8], root: &str) -> Result<Self, StraddleError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(archive))?;

        for index in 0..archive.len() {
            let entry = archive.by_index(index)?;
            if entry.name().ends_with(".txt") {
                info!("Reading {} from symbol master archive", entry.name());
                return Self::from_reader(entry, root);
            }
        }

        Err(StraddleError::SymbolMaster(
            "no .txt file in symbol master archive".to_string(),
        ))
    }

    /// Load options on `root` from pipe-delimited text
    pub fn from_reader<R: Read>(reader: R, root: &str) -> Result<Self, StraddleError> {
        let mut csv = csv::ReaderBuilder::new()
            .delimiter(b'|')
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut contracts = Vec::new();
        let mut skipped = 0usize;

        for row in csv.deserialize::<MasterRow>() {
            let row = row?;
            if row.symbol != root || !row.instrument.starts_with("OPT") {
                continue;
            }
            match parse_contract(row) {
                Some(contract) => contracts.push(contract),
                None => skipped += 1,
            }
        }

        info!(
            "Symbol master loaded: {} {} options ({} malformed rows skipped)",
            contracts.len(),
            root,
            skipped
        );
        Ok(Self { contracts })
    }

    /// Nearest-expiry CE/PE pair at `strike` expiring on or after `on_or_after`
    pub fn atm_pair(&self, strike: f64, on_or_after: NaiveDate) -> Option<StraddleLegs> {
        let at_strike = |kind: OptionKind, expiry: NaiveDate| {
            self.contracts.iter().find(|c| {
                c.kind == kind && c.expiry == expiry && (c.strike - strike).abs() < 1e-6
            })
        };

        let mut expiries: Vec<NaiveDate> = self
            .contracts
            .iter()
            .filter(|c| c.expiry >= on_or_after && (c.strike - strike).abs() < 1e-6)
            .map(|c| c.expiry)
            .collect();
        expiries.sort();
        expiries.dedup();

        expiries.into_iter().find_map(|expiry| {
            let call = at_strike(OptionKind::Call, expiry)?;
            let put = at_strike(OptionKind::Put, expiry)?;
            debug!(
                "Resolved straddle {} / {} from symbol master",
                call.trading_symbol, put.trading_symbol
            );
            Some(StraddleLegs {
                expiry: format_expiry(expiry),
                call: call.token.clone(),
                put: put.token.clone(),
            })
        })
    }

    /// All loaded contracts
    pub fn contracts(&self) -> &[OptionContract] {
        &self.contracts
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

fn parse_contract(row: MasterRow) -> Option<OptionContract> {
    let kind = OptionKind::from_master_code(&row.option_type)?;
    let expiry = NaiveDate::parse_from_str(&row.expiry, EXPIRY_FORMAT).ok()?;
    let strike = row.strike_price.parse::<f64>().ok()?;
    Some(OptionContract {
        token: row.token,
        trading_symbol: row.trading_symbol,
        expiry,
        kind,
        strike,
    })
}
