//! The backtest driver: SETUP → STEPPING → DONE.
//!
//! Central invariant: a decision at index `t` sees bars `t+1-L ..= t`
//! and settles at bar `t+1`'s open. No decision input may include any
//! bar at or after its own settlement bar.

use super::{BacktestConfig, BacktestReport, EngineError, EquityPoint};
use crate::broker::PaperBroker;
use crate::decision::{Action, DecisionSource};
use crate::domain::Bar;
use std::collections::{BTreeMap, HashMap};

/// Replay `series` through `source`, settling every decision at the next
/// bar's open.
///
/// All series share a positional time index; the shortest series bounds
/// the run, and its final bar is reserved as the settlement price for
/// the last decision step. An empty equity curve (no step had both a
/// decision bar and a settlement bar) is reported, not an error.
///
/// Equity rows are keyed by the settlement bar's timestamp taken from
/// the lexicographically first symbol. Symbols are replayed as a sorted
/// map, so row keying does not depend on configuration order.
pub fn run_backtest(
    series: &BTreeMap<String, Vec<Bar>>,
    config: &BacktestConfig,
    source: &mut dyn DecisionSource,
) -> Result<BacktestReport, EngineError> {
    let start_index = setup(series, config)?;
    let min_len = series.values().map(Vec::len).min().unwrap_or(0);
    let lookback = config.lookback;

    let mut broker = PaperBroker::new(config.initial_cash_usd);
    let mut equity_curve = Vec::new();

    // The trailing bar of the shortest series is execution-only.
    let last_decision_index = match min_len.checked_sub(2) {
        Some(i) => i,
        None => {
            tracing::warn!("not enough bars for a single decision step");
            return Ok(BacktestReport {
                equity_curve,
                portfolio: broker.into_portfolio(),
            });
        }
    };

    for t in start_index..=last_decision_index {
        // Windows hold information available at decision time: bars <= t.
        let Some(windows) = build_windows(series, t, lookback) else {
            tracing::warn!(step = t, "insufficient lookback for step, skipping");
            continue;
        };

        // One joint call: decisions are made across symbols, not per
        // symbol, since pair recommendations span the whole set.
        let decisions = source.decide(&windows);

        for asset in &decisions.assets {
            let Some(bars) = series.get(&asset.symbol) else {
                tracing::warn!(symbol = %asset.symbol, "decision for untracked symbol, ignoring");
                continue;
            };
            let settle = &bars[t + 1];
            // Inverted guard so NaN opens are skipped too.
            if !(settle.open > 0.0) {
                tracing::warn!(
                    symbol = %asset.symbol,
                    price = settle.open,
                    "invalid settlement price, skipping action"
                );
                continue;
            }
            match asset.action {
                Action::Buy => broker.market_buy(
                    settle.timestamp,
                    &asset.symbol,
                    config.order_notional_usd,
                    settle.open,
                ),
                Action::Sell => broker.market_sell_all(settle.timestamp, &asset.symbol, settle.open),
                Action::Hold => {}
            }
        }

        // Mark at settlement-bar opens; the row is keyed by the
        // settlement bar, the first instant the step's fills exist.
        let mut marks = HashMap::new();
        for (symbol, bars) in series {
            let open = bars[t + 1].open;
            if open > 0.0 {
                marks.insert(symbol.clone(), open);
            }
        }
        let row_ts = series
            .values()
            .next()
            .map(|bars| bars[t + 1].timestamp)
            .expect("series is non-empty after setup");

        equity_curve.push(EquityPoint {
            timestamp: row_ts,
            equity: broker.equity(&marks),
            cash: broker.portfolio().cash_usd(),
        });
    }

    if equity_curve.is_empty() {
        tracing::warn!("backtest produced no equity rows; check start and lookback");
    }

    Ok(BacktestReport {
        equity_curve,
        portfolio: broker.into_portfolio(),
    })
}

/// SETUP: resolve and validate the shared start index.
///
/// The start index is computed independently per symbol (first bar at or
/// after the requested start) and the maximum is taken, so every symbol
/// has a bar at the chosen start. The full lookback window must fit
/// before it.
fn setup(series: &BTreeMap<String, Vec<Bar>>, config: &BacktestConfig) -> Result<usize, EngineError> {
    if series.is_empty() {
        return Err(EngineError::NoSymbols);
    }
    debug_assert!(config.lookback >= 1, "lookback must be at least 1");

    let mut start_index = 0;
    for (symbol, bars) in series {
        if bars.is_empty() {
            return Err(EngineError::EmptySeries(symbol.clone()));
        }
        let first = bars
            .iter()
            .position(|bar| bar.timestamp >= config.start)
            .ok_or_else(|| EngineError::NoBarsAtOrAfterStart(symbol.clone()))?;
        start_index = start_index.max(first);
    }

    if start_index < config.lookback {
        return Err(EngineError::InsufficientLookback {
            start_index,
            lookback: config.lookback,
        });
    }

    Ok(start_index)
}

/// Lookback windows of the most recent `lookback` bars ending at `t`,
/// one per symbol. `None` when any window would begin before index 0.
fn build_windows<'a>(
    series: &'a BTreeMap<String, Vec<Bar>>,
    t: usize,
    lookback: usize,
) -> Option<BTreeMap<String, &'a [Bar]>> {
    let begin = (t + 1).checked_sub(lookback)?;
    let mut windows = BTreeMap::new();
    for (symbol, bars) in series {
        windows.insert(symbol.clone(), &bars[begin..=t]);
    }
    Some(windows)
}
