//! Serializable run configuration.
//!
//! Configuration problems are fatal and surface before any ledger
//! mutation: a run either starts with a fully validated config or not
//! at all.

use chrono::{DateTime, Utc};
use papertrade_core::engine::BacktestConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Unique identifier for a run (content-addressable hash).
pub type RunId = String;

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("trading.symbols must not be empty")]
    NoSymbols,
    #[error("trading.lookback_bars must be at least 1")]
    ZeroLookback,
    #[error("trading.order_notional_usd must be positive and finite, got {0}")]
    BadNotional(f64),
    #[error("trading.initial_cash_usd must be finite, got {0}")]
    BadInitialCash(f64),
    #[error("trading.historic_start must be set for backtest mode (e.g. 2024-01-01T00:00:00Z)")]
    MissingHistoricStart,
    #[error("trading.poll_interval_secs must be at least 1 for live mode")]
    ZeroPollInterval,
}

/// Top-level TOML configuration for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub trading: TradingConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Trading parameters shared by backtest and live modes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Symbols to track, e.g. `"BTC/USDT"`.
    pub symbols: Vec<String>,
    /// Lookback window length L, in bars.
    pub lookback_bars: usize,
    /// Fixed notional per BUY, in USD. Confidence never scales this.
    pub order_notional_usd: f64,
    /// Starting cash balance. Always explicit — no implicit default.
    pub initial_cash_usd: f64,
    /// First decision bar for backtests (required in backtest mode).
    #[serde(default)]
    pub historic_start: Option<DateTime<Utc>>,
    /// Live polling cadence, in seconds.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_poll_interval_secs() -> u64 {
    900
}

/// Where per-symbol bar CSVs live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    pub dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
        }
    }
}

/// Artifact destinations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub equity_csv: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            equity_csv: PathBuf::from("backtest_equity.csv"),
        }
    }
}

impl RunConfig {
    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validation shared by both modes. Backtest mode additionally
    /// requires `historic_start` — see [`RunConfig::backtest_config`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.trading;
        if t.symbols.is_empty() {
            return Err(ConfigError::NoSymbols);
        }
        if t.lookback_bars == 0 {
            return Err(ConfigError::ZeroLookback);
        }
        if !(t.order_notional_usd > 0.0 && t.order_notional_usd.is_finite()) {
            return Err(ConfigError::BadNotional(t.order_notional_usd));
        }
        if !t.initial_cash_usd.is_finite() {
            return Err(ConfigError::BadInitialCash(t.initial_cash_usd));
        }
        if t.poll_interval_secs == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        Ok(())
    }

    /// Resolve the engine-facing backtest parameters. Fails when
    /// `historic_start` is absent.
    pub fn backtest_config(&self) -> Result<BacktestConfig, ConfigError> {
        let start = self
            .trading
            .historic_start
            .ok_or(ConfigError::MissingHistoricStart)?;
        Ok(BacktestConfig {
            start,
            lookback: self.trading.lookback_bars,
            order_notional_usd: self.trading.order_notional_usd,
            initial_cash_usd: self.trading.initial_cash_usd,
        })
    }

    /// Deterministic content hash of this configuration.
    ///
    /// Two runs with identical configs share a RunId, which makes
    /// artifacts reproducible and comparable.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).expect("RunConfig serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
