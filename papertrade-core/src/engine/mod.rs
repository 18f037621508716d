//! Backtest engine — bar-sequenced replay with next-bar-open settlement.

mod backtest;

pub use backtest::run_backtest;

use crate::domain::Portfolio;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parameters for one backtest run.
///
/// All values are explicit — in particular the starting cash balance is
/// always supplied by the caller, never defaulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// First decision bar is the earliest shared index at or after this.
    pub start: DateTime<Utc>,
    /// Lookback window length L, in bars. Must be at least 1.
    pub lookback: usize,
    /// Fixed notional applied to every BUY, regardless of confidence.
    pub order_notional_usd: f64,
    pub initial_cash_usd: f64,
}

/// Fatal setup failures. Once stepping begins, nothing here is raised —
/// per-step problems are skipped and logged instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no symbols supplied")]
    NoSymbols,
    #[error("no bars loaded for symbol '{0}'")]
    EmptySeries(String),
    #[error("no bars at or after the requested start for symbol '{0}'")]
    NoBarsAtOrAfterStart(String),
    #[error(
        "insufficient lookback history: start index {start_index} < lookback {lookback}; \
         choose a later start or load more padding"
    )]
    InsufficientLookback { start_index: usize, lookback: usize },
}

/// One row of the equity curve, keyed by the settlement bar's timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
    pub cash: f64,
}

/// Output artifact of a run: the ordered equity curve plus the final
/// ledger (with its complete fill log).
#[derive(Debug, Clone)]
pub struct BacktestReport {
    pub equity_curve: Vec<EquityPoint>,
    pub portfolio: Portfolio,
}
