//! Backtest runner — wires together config, data loading, the engine,
//! and artifact export.

use papertrade_core::decision::DecisionSource;
use papertrade_core::engine::{run_backtest, BacktestReport, EngineError};
use std::path::PathBuf;
use thiserror::Error;

use crate::config::{ConfigError, RunConfig};
use crate::data_loader::{load_all_bars, LoadError};
use crate::reporting::write_equity_csv;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("failed to write artifact: {0}")]
    Artifact(#[from] anyhow::Error),
}

/// Outcome of a historic run: the engine report plus where the equity
/// artifact was written.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: BacktestReport,
    pub equity_csv: PathBuf,
    pub run_id: String,
}

/// Run a full historic backtest from a validated config.
///
/// Loads and validates every symbol's bars (any failure is fatal before
/// the ledger is touched), replays them through `source`, and writes the
/// equity curve artifact. An empty curve is logged, not an error.
pub fn run_historic(config: &RunConfig, source: &mut dyn DecisionSource) -> Result<RunOutcome, RunError> {
    let backtest_config = config.backtest_config()?;
    let series = load_all_bars(&config.data.dir, &config.trading.symbols)?;

    let run_id = config.run_id();
    tracing::info!(
        run_id = %run_id,
        symbols = config.trading.symbols.len(),
        lookback = backtest_config.lookback,
        "starting historic run"
    );

    let report = run_backtest(&series, &backtest_config, source)?;

    write_equity_csv(&config.output.equity_csv, &report.equity_curve)?;
    if report.equity_curve.is_empty() {
        tracing::warn!("no equity rows produced; check historic_start and lookback_bars");
    } else {
        tracing::info!(
            rows = report.equity_curve.len(),
            fills = report.portfolio.fills().len(),
            final_equity = report.equity_curve.last().map(|p| p.equity),
            path = %config.output.equity_csv.display(),
            "saved equity curve"
        );
    }

    Ok(RunOutcome {
        report,
        equity_csv: config.output.equity_csv.clone(),
        run_id,
    })
}
