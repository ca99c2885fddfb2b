//! Straddle Reading Fetcher

use crate::expiry::{format_expiry, weekly_expiry};
use crate::master::SymbolMaster;
use crate::strike::atm_strike;
use crate::symbol::{option_symbol, OptionKind, StraddleLegs};
use crate::StraddleError;
use chrono::{DateTime, Duration, NaiveDate, Utc, Weekday};
use data_validator::Validator;
use premium_window::Reading;
use quote_protocol::QuoteSource;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

/// Which straddle to track
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentConfig {
    /// Exchange of the underlying index (default: NSE)
    pub underlying_exchange: String,
    /// Broker token of the underlying (default: 26000, NIFTY 50)
    pub underlying_token: String,
    /// Exchange of the options (default: NFO)
    pub option_exchange: String,
    /// Trading symbol prefix (default: NIFTY)
    pub symbol_root: String,
    /// Strike grid spacing (default: 50)
    pub strike_step: f64,
    /// Weekly expiry day (default: Thursday)
    pub expiry_weekday: Weekday,
    /// Exchange clock offset from UTC used to pick the expiry date (default: +330, IST)
    pub utc_offset_minutes: i64,
    /// Extracted symbol master; when set, legs are quoted by master token
    pub symbol_master_path: Option<PathBuf>,
    /// Zipped symbol master downloaded at startup (takes precedence over the path)
    pub symbol_master_url: Option<String>,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            underlying_exchange: "NSE".to_string(),
            underlying_token: "26000".to_string(),
            option_exchange: "NFO".to_string(),
            symbol_root: "NIFTY".to_string(),
            strike_step: 50.0,
            expiry_weekday: Weekday::Thu,
            utc_offset_minutes: 330,
            symbol_master_path: None,
            symbol_master_url: None,
        }
    }
}

/// Produces one `Reading` per call from a quote source
pub struct StraddleFetcher {
    config: InstrumentConfig,
    master: Option<SymbolMaster>,
    validator: Validator,
}

impl StraddleFetcher {
    /// Create a fetcher, downloading the symbol master if a URL is configured
    pub async fn load(config: InstrumentConfig) -> Result<Self, StraddleError> {
        match config.symbol_master_url.clone() {
            Some(url) => {
                let master = SymbolMaster::download(&url, &config.symbol_root).await?;
                Self::from_parts(config, Some(master))
            }
            None => Self::new(config),
        }
    }

    /// Create a fetcher, loading the symbol master file if one is configured
    pub fn new(config: InstrumentConfig) -> Result<Self, StraddleError> {
        let master = match &config.symbol_master_path {
            Some(path) => Some(SymbolMaster::from_path(path, &config.symbol_root)?),
            None => None,
        };
        Self::from_parts(config, master)
    }

    fn from_parts(
        config: InstrumentConfig,
        master: Option<SymbolMaster>,
    ) -> Result<Self, StraddleError> {
        if !(config.strike_step.is_finite() && config.strike_step > 0.0) {
            return Err(StraddleError::InvalidConfig(format!(
                "strike_step must be positive, got {}",
                config.strike_step
            )));
        }

        info!(
            "Tracking {} straddle ({}:{} underlying, step {})",
            config.symbol_root, config.underlying_exchange, config.underlying_token, config.strike_step
        );

        Ok(Self {
            config,
            master,
            validator: Validator::default(),
        })
    }

    /// Use an already loaded symbol master
    pub fn with_master(mut self, master: SymbolMaster) -> Self {
        self.master = Some(master);
        self
    }

    /// Quote the underlying and both ATM legs
    pub async fn fetch(
        &self,
        source: &dyn QuoteSource,
        now: DateTime<Utc>,
    ) -> Result<Reading, StraddleError> {
        let config = &self.config;

        let underlying = source
            .get_quote(&config.underlying_exchange, &config.underlying_token)
            .await?;
        let spot = self.validator.validate_price("underlying", underlying.last_price)?;
        let strike = atm_strike(spot, config.strike_step);

        let legs = self.resolve_legs(strike, self.exchange_date(now))?;

        let call = source.get_quote(&config.option_exchange, &legs.call).await?;
        let put = source.get_quote(&config.option_exchange, &legs.put).await?;
        let call_price = self.validator.validate_price("call", call.last_price)?;
        let put_price = self.validator.validate_price("put", put.last_price)?;

        debug!(
            "Spot {:.2}, strike {}, {} CE {:.2} + PE {:.2} = {:.2}",
            spot,
            strike,
            legs.expiry,
            call_price,
            put_price,
            call_price + put_price
        );

        Ok(Reading::new(now, strike, call_price, put_price))
    }

    /// Quote identifiers for the straddle at `strike` as of `date`
    pub fn resolve_legs(&self, strike: f64, date: NaiveDate) -> Result<StraddleLegs, StraddleError> {
        if let Some(master) = &self.master {
            return master
                .atm_pair(strike, date)
                .ok_or(StraddleError::NoContract { strike, date });
        }

        let expiry = format_expiry(weekly_expiry(date, self.config.expiry_weekday));
        let root = &self.config.symbol_root;
        Ok(StraddleLegs {
            call: option_symbol(root, &expiry, OptionKind::Call, strike),
            put: option_symbol(root, &expiry, OptionKind::Put, strike),
            expiry,
        })
    }

    /// Calendar date on the exchange clock
    pub fn exchange_date(&self, now: DateTime<Utc>) -> NaiveDate {
        (now + Duration::minutes(self.config.utc_offset_minutes)).date_naive()
    }

    /// Get the configuration
    pub fn config(&self) -> &InstrumentConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use quote_protocol::{MockQuoteSource, QuoteError};

    fn monday_morning() -> DateTime<Utc> {
        // 09:30 IST, Monday 2025-05-12
        Utc.with_ymd_and_hms(2025, 5, 12, 4, 0, 0).unwrap()
    }

    fn source() -> MockQuoteSource {
        MockQuoteSource::new()
            .with_price("NSE", "26000", 24_512.35)
            .with_price("NFO", "NIFTY15MAY25C24500", 120.5)
            .with_price("NFO", "NIFTY15MAY25P24500", 98.0)
    }

    #[tokio::test]
    async fn test_fetch_reading() {
        let fetcher = StraddleFetcher::new(InstrumentConfig::default()).unwrap();
        let reading = fetcher.fetch(&source(), monday_morning()).await.unwrap();

        assert_eq!(reading.strike_price, 24_500.0);
        assert_eq!(reading.call_price, 120.5);
        assert_eq!(reading.put_price, 98.0);
        assert_eq!(reading.total_premium, 218.5);
        assert_eq!(reading.timestamp, monday_morning());
    }

    #[tokio::test]
    async fn test_missing_leg_discards_reading() {
        let fetcher = StraddleFetcher::new(InstrumentConfig::default()).unwrap();
        let source = MockQuoteSource::new()
            .with_price("NSE", "26000", 24_512.35)
            .with_price("NFO", "NIFTY15MAY25C24500", 120.5);

        let err = fetcher.fetch(&source, monday_morning()).await.unwrap_err();
        assert!(matches!(
            err,
            StraddleError::Quote(QuoteError::QuoteUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_non_positive_price_rejected() {
        let fetcher = StraddleFetcher::new(InstrumentConfig::default()).unwrap();
        let source = source();
        source.script("NFO", "NIFTY15MAY25P24500", [Some(0.0)]);

        let err = fetcher.fetch(&source, monday_morning()).await.unwrap_err();
        assert!(matches!(err, StraddleError::InvalidPrice(_)));
    }

    #[test]
    fn test_expiry_follows_exchange_clock() {
        let fetcher = StraddleFetcher::new(InstrumentConfig::default()).unwrap();
        // 20:00 UTC Thursday is already Friday in IST
        let now = Utc.with_ymd_and_hms(2025, 5, 15, 20, 0, 0).unwrap();
        let legs = fetcher.resolve_legs(24_500.0, fetcher.exchange_date(now)).unwrap();
        assert_eq!(legs.expiry, "22MAY25");

        let utc_fetcher = StraddleFetcher::new(InstrumentConfig {
            utc_offset_minutes: 0,
            ..Default::default()
        })
        .unwrap();
        let legs = utc_fetcher
            .resolve_legs(24_500.0, utc_fetcher.exchange_date(now))
            .unwrap();
        assert_eq!(legs.expiry, "15MAY25");
        assert_eq!(legs.call, "NIFTY15MAY25C24500");
    }

    #[test]
    fn test_master_resolution_uses_tokens() {
        let master = SymbolMaster::from_reader(
            "Exchange|Token|LotSize|Symbol|TradingSymbol|Expiry|Instrument|OptionType|StrikePrice|TickSize|\n\
             NFO|35001|75|NIFTY|NIFTY15MAY25C24500|15-MAY-2025|OPTIDX|CE|24500|0.05|\n\
             NFO|35002|75|NIFTY|NIFTY15MAY25P24500|15-MAY-2025|OPTIDX|PE|24500|0.05|\n"
                .as_bytes(),
            "NIFTY",
        )
        .unwrap();
        let fetcher = StraddleFetcher::new(InstrumentConfig::default())
            .unwrap()
            .with_master(master);

        let date = NaiveDate::from_ymd_opt(2025, 5, 12).unwrap();
        let legs = fetcher.resolve_legs(24_500.0, date).unwrap();
        assert_eq!((legs.call.as_str(), legs.put.as_str()), ("35001", "35002"));
        assert!(matches!(
            fetcher.resolve_legs(25_000.0, date),
            Err(StraddleError::NoContract { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_without_url_generates_symbols() {
        let fetcher = StraddleFetcher::load(InstrumentConfig::default()).await.unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 5, 12).unwrap();
        assert_eq!(fetcher.resolve_legs(24_500.0, date).unwrap().put, "NIFTY15MAY25P24500");
    }

    #[tokio::test]
    async fn test_load_reports_unreachable_master() {
        let config = InstrumentConfig {
            symbol_master_url: Some("http://127.0.0.1:9/NFO_symbols.txt.zip".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            StraddleFetcher::load(config).await,
            Err(StraddleError::SymbolMaster(_))
        ));
    }

    #[test]
    fn test_rejects_bad_step() {
        assert!(StraddleFetcher::new(InstrumentConfig {
            strike_step: 0.0,
            ..Default::default()
        })
        .is_err());
    }
}
