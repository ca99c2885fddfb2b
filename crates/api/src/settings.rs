//! Monitor Settings
//!
//! Layered configuration: built-in defaults, then an optional TOML file, then
//! `STRADDLE_*` environment variables (`__` separates nested keys, e.g.
//! `STRADDLE_MONITOR__WINDOW_SIZE=20`).

use alerting::MonitorConfig;
use config::{Config, Environment, File};
use data_validator::{ValidationError, Validator};
use poll_scheduler::PollConfig;
use quote_protocol::{Credentials, DEFAULT_HOST};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use straddle::InstrumentConfig;
use thiserror::Error;
use tracing::Level;

/// Settings errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid setting: {0}")]
    Invalid(#[from] ValidationError),
    #[error("Unknown log level {0:?} (expected trace, debug, info, warn or error)")]
    InvalidLogLevel(String),
}

/// Alert monitor settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// Last logs count averaged (1-500)
    pub window_size: usize,
    /// Percentage over the average that alerts (0.1-100.0)
    pub percentage_increase: f64,
    /// Ring the terminal bell on alerts
    pub sound_on_alert: bool,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        let defaults = MonitorConfig::default();
        Self {
            window_size: defaults.window_size,
            percentage_increase: defaults.percentage_increase,
            sound_on_alert: true,
        }
    }
}

impl MonitorSettings {
    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            window_size: self.window_size,
            percentage_increase: self.percentage_increase,
        }
    }
}

/// Dashboard chart/table settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChartSettings {
    /// Readings kept on the chart (10-500)
    pub max_points: usize,
    /// Default rows in the table view
    pub table_rows: usize,
    /// How long an alert banner stays up
    pub banner_seconds: u64,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            max_points: 100,
            table_rows: 20,
            banner_seconds: 5,
        }
    }
}

/// Quote source settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrokerSettings {
    /// Use the built-in mock source instead of the broker
    pub mock: bool,
    pub host: String,
    pub timeout_ms: u64,
    pub credentials: Credentials,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            mock: true,
            host: DEFAULT_HOST.to_string(),
            timeout_ms: 5000,
            credentials: Credentials::default(),
        }
    }
}

impl BrokerSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Spreadsheet export settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Session log written on shutdown (None disables)
    pub readings_path: Option<PathBuf>,
    /// File the execute action appends to
    pub executed_path: PathBuf,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            readings_path: Some(PathBuf::from("nifty_straddle_log.xlsx")),
            executed_path: PathBuf::from("executed_data.xlsx"),
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Max level (trace, debug, info, warn, error)
    pub level: String,
    /// Emit JSON lines instead of text
    pub json: bool,
}

impl LoggingSettings {
    /// Parsed max level
    pub fn max_level(&self) -> Result<Level, SettingsError> {
        self.level
            .trim()
            .parse::<Level>()
            .map_err(|_| SettingsError::InvalidLogLevel(self.level.clone()))
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// All settings of the monitor
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub monitor: MonitorSettings,
    pub poll: PollConfig,
    pub chart: ChartSettings,
    pub instrument: InstrumentConfig,
    pub broker: BrokerSettings,
    pub export: ExportSettings,
    pub server: ServerSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    /// Load from `path` (optional) and the environment, then validate
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let settings: Settings = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("STRADDLE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Check every ranged setting and the log level
    pub fn validate(&self) -> Result<(), SettingsError> {
        let validator = Validator::default();
        validator.validate_window_size(self.monitor.window_size)?;
        validator.validate_percentage(self.monitor.percentage_increase)?;
        validator.validate_poll_interval(self.poll.interval_secs)?;
        validator.validate_chart_points(self.chart.max_points)?;
        self.logging.max_level()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_config(name: &str, body: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("straddle-{}-{}.toml", name, std::process::id()));
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.monitor.window_size, 10);
        assert_eq!(settings.monitor.percentage_increase, 1.0);
        assert_eq!(settings.poll.interval_secs, 1.0);
        assert_eq!(settings.chart.max_points, 100);
        assert!(settings.monitor.sound_on_alert);
        assert!(settings.broker.mock);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("straddle-does-not-exist.toml");
        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.server.addr, "0.0.0.0:8080");
        assert_eq!(settings.instrument.symbol_root, "NIFTY");
    }

    #[test]
    fn test_file_overrides() {
        let path = write_config(
            "overrides",
            r#"
[monitor]
window_size = 25
percentage_increase = 2.5
sound_on_alert = false

[poll]
interval_secs = 0.5

[instrument]
symbol_root = "BANKNIFTY"
strike_step = 100.0
expiry_weekday = "Wed"

[broker]
mock = false

[broker.credentials]
user_id = "FA1234"
"#,
        );

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.monitor.window_size, 25);
        assert!(!settings.monitor.sound_on_alert);
        assert_eq!(settings.poll.interval_secs, 0.5);
        assert_eq!(settings.instrument.symbol_root, "BANKNIFTY");
        assert_eq!(settings.instrument.expiry_weekday, chrono::Weekday::Wed);
        assert!(!settings.broker.mock);
        assert_eq!(settings.broker.credentials.user_id, "FA1234");
        // Untouched sections keep defaults
        assert_eq!(settings.chart.max_points, 100);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_out_of_range_rejected() {
        let path = write_config("invalid", "[monitor]\nwindow_size = 501\n");
        let err = Settings::load(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid(ValidationError::OutOfRange { field: "window_size", .. })));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_log_level_checked() {
        let mut settings = Settings::default();
        settings.logging.level = "DEBUG".to_string();
        assert_eq!(settings.logging.max_level().unwrap(), Level::DEBUG);

        settings.logging.level = "verbose".to_string();
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::InvalidLogLevel(level)) if level == "verbose"
        ));

        let path = write_config("level", "[logging]\nlevel = \"infoo\"\n");
        assert!(matches!(Settings::load(&path), Err(SettingsError::InvalidLogLevel(_))));
        fs::remove_file(&path).unwrap();
    }
}
