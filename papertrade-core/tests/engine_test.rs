//! Scenario tests for the backtest driver: setup validation, execution
//! semantics, and degrade-gracefully behavior.

use chrono::{Duration, TimeZone, Utc};
use papertrade_core::decision::{
    Action, AssetDecision, DecisionSet, DecisionSource, HoldAll,
};
use papertrade_core::domain::Bar;
use papertrade_core::engine::{run_backtest, BacktestConfig, EngineError};
use std::collections::BTreeMap;

fn flat_bars(n: usize, open: f64) -> Vec<Bar> {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| Bar {
            timestamp: base + Duration::days(i as i64),
            open,
            high: open + 1.0,
            low: open - 1.0,
            close: open,
            volume: 1_000.0,
        })
        .collect()
}

fn config(start_day: u32, lookback: usize) -> BacktestConfig {
    BacktestConfig {
        start: Utc.with_ymd_and_hms(2024, 1, start_day, 0, 0, 0).unwrap(),
        lookback,
        order_notional_usd: 1_000.0,
        initial_cash_usd: 10_000.0,
    }
}

/// Plays back a fixed per-step script of actions for one symbol,
/// holding everything else.
struct Scripted {
    symbol: String,
    script: Vec<Action>,
    step: usize,
}

impl Scripted {
    fn new(symbol: &str, script: Vec<Action>) -> Self {
        Self {
            symbol: symbol.to_string(),
            script,
            step: 0,
        }
    }
}

impl DecisionSource for Scripted {
    fn decide(&mut self, _windows: &BTreeMap<String, &[Bar]>) -> DecisionSet {
        let action = self.script.get(self.step).copied().unwrap_or(Action::Hold);
        self.step += 1;
        DecisionSet {
            assets: vec![AssetDecision {
                symbol: self.symbol.clone(),
                action,
                confidence: 1.0,
                comment: String::new(),
            }],
            pairs: Vec::new(),
        }
    }
}

// ── Setup validation ─────────────────────────────────────────────────

#[test]
fn setup_fails_on_empty_symbol_set() {
    let series = BTreeMap::new();
    let err = run_backtest(&series, &config(10, 5), &mut HoldAll).unwrap_err();
    assert!(matches!(err, EngineError::NoSymbols));
}

#[test]
fn setup_fails_on_empty_series() {
    let mut series = BTreeMap::new();
    series.insert("SYM".to_string(), Vec::new());
    let err = run_backtest(&series, &config(10, 5), &mut HoldAll).unwrap_err();
    assert!(matches!(err, EngineError::EmptySeries(s) if s == "SYM"));
}

#[test]
fn setup_fails_when_start_is_after_all_bars() {
    let mut series = BTreeMap::new();
    series.insert("SYM".to_string(), flat_bars(10, 100.0));
    let err = run_backtest(&series, &config(25, 5), &mut HoldAll).unwrap_err();
    assert!(matches!(err, EngineError::NoBarsAtOrAfterStart(s) if s == "SYM"));
}

#[test]
fn setup_fails_when_lookback_does_not_fit_before_start() {
    // Start resolves to index 4; a 10-bar window cannot fit before it.
    let mut series = BTreeMap::new();
    series.insert("SYM".to_string(), flat_bars(30, 100.0));
    let err = run_backtest(&series, &config(5, 10), &mut HoldAll).unwrap_err();
    assert!(matches!(
        err,
        EngineError::InsufficientLookback { start_index: 4, lookback: 10 }
    ));
}

#[test]
fn start_index_is_max_across_symbols() {
    // "LATE" begins ten days after "EARLY"; the shared start index must
    // be late enough that LATE has a bar, which also means EARLY's
    // window is deeper than strictly required. Both get 5-bar windows.
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let early = flat_bars(40, 100.0);
    let late: Vec<Bar> = (0..30)
        .map(|i| Bar {
            timestamp: base + Duration::days(10 + i as i64),
            open: 200.0,
            high: 201.0,
            low: 199.0,
            close: 200.0,
            volume: 1_000.0,
        })
        .collect();

    let mut series = BTreeMap::new();
    series.insert("EARLY".to_string(), early);
    series.insert("LATE".to_string(), late);

    // Start at Jan 12: EARLY's first index is 11, LATE's is 1 — but a
    // positional index shared across series means setup takes the max.
    let report = run_backtest(&series, &config(12, 5), &mut HoldAll).unwrap();
    // min_len = 30, start index 11, so steps run 11..=28.
    assert_eq!(report.equity_curve.len(), 18);
}

#[test]
fn equity_rows_are_keyed_by_the_first_symbol_in_sort_order() {
    // "AAA" bars land at midnight, "ZZZ" bars at noon. Rows must carry
    // AAA's settlement timestamps regardless of how the symbols were
    // configured, since replay iterates them in sorted order.
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let midnight = flat_bars(30, 100.0);
    let noon: Vec<Bar> = (0..30)
        .map(|i| Bar {
            timestamp: base + Duration::days(i as i64) + Duration::hours(12),
            open: 200.0,
            high: 201.0,
            low: 199.0,
            close: 200.0,
            volume: 1_000.0,
        })
        .collect();

    let mut series = BTreeMap::new();
    series.insert("ZZZ".to_string(), noon);
    series.insert("AAA".to_string(), midnight);

    let report = run_backtest(&series, &config(11, 5), &mut HoldAll).unwrap();
    // Start index 10; the first row settles at AAA's bar 11 (Jan 12).
    let expected = Utc.with_ymd_and_hms(2024, 1, 12, 0, 0, 0).unwrap();
    assert_eq!(report.equity_curve[0].timestamp, expected);
    assert!(report
        .equity_curve
        .iter()
        .all(|p| p.timestamp.time() == expected.time()));
}

// ── Execution semantics ──────────────────────────────────────────────

#[test]
fn buy_then_sell_matches_hand_accounting() {
    let mut series = BTreeMap::new();
    series.insert("SYM".to_string(), flat_bars(30, 100.0));

    let mut source = Scripted::new("SYM", vec![Action::Buy, Action::Sell]);
    let report = run_backtest(&series, &config(11, 5), &mut source).unwrap();

    let fills = report.portfolio.fills();
    assert_eq!(fills.len(), 2);
    assert_eq!(fills[0].size, 10.0); // $1000 notional at $100
    assert_eq!(fills[1].size, 10.0); // sell-all of the same position

    // Flat prices: round trip returns to the starting balance.
    assert_eq!(report.portfolio.cash_usd(), 10_000.0);
    assert!(report.portfolio.position("SYM").is_none());
}

#[test]
fn hold_steps_apply_zero_fills() {
    let mut series = BTreeMap::new();
    series.insert("SYM".to_string(), flat_bars(30, 100.0));

    let report = run_backtest(&series, &config(11, 5), &mut HoldAll).unwrap();

    assert!(report.portfolio.fills().is_empty());
    assert!(report
        .equity_curve
        .iter()
        .all(|p| p.equity == 10_000.0 && p.cash == 10_000.0));
}

#[test]
fn non_positive_settlement_price_skips_the_action() {
    let mut bars = flat_bars(30, 100.0);
    bars[11].open = 0.0; // settlement bar for the first decision step

    let mut series = BTreeMap::new();
    series.insert("SYM".to_string(), bars);

    let mut source = Scripted::new("SYM", vec![Action::Buy, Action::Buy]);
    let report = run_backtest(&series, &config(11, 5), &mut source).unwrap();

    // First step (t=10) settles at bar 11 whose open is zero: skipped.
    // Second step (t=11) fills normally at bar 12.
    let fills = report.portfolio.fills();
    assert_eq!(fills.len(), 1);
    assert_eq!(fills[0].price, 100.0);
}

#[test]
fn nan_settlement_price_skips_the_action() {
    // A NaN open must behave exactly like a non-positive one: the step
    // is skipped instead of poisoning cash with NaN arithmetic.
    let mut bars = flat_bars(30, 100.0);
    bars[11].open = f64::NAN;

    let mut series = BTreeMap::new();
    series.insert("SYM".to_string(), bars);

    let mut source = Scripted::new("SYM", vec![Action::Buy, Action::Buy]);
    let report = run_backtest(&series, &config(11, 5), &mut source).unwrap();

    let fills = report.portfolio.fills();
    assert_eq!(fills.len(), 1);
    assert_eq!(fills[0].price, 100.0);
    assert!(report.portfolio.cash_usd().is_finite());
    assert!(report.equity_curve.iter().all(|p| p.equity.is_finite()));
}

#[test]
fn decisions_for_untracked_symbols_are_ignored() {
    let mut series = BTreeMap::new();
    series.insert("SYM".to_string(), flat_bars(30, 100.0));

    let mut source = Scripted::new("GHOST", vec![Action::Buy; 20]);
    let report = run_backtest(&series, &config(11, 5), &mut source).unwrap();
    assert!(report.portfolio.fills().is_empty());
}

#[test]
fn last_bar_is_reserved_for_settlement() {
    // 13 bars, start index 11, lookback 5: exactly one decision step at
    // t=11, settling on the final bar (t=12). t=12 itself never decides.
    let mut series = BTreeMap::new();
    series.insert("SYM".to_string(), flat_bars(13, 100.0));

    let mut source = Scripted::new("SYM", vec![Action::Buy; 5]);
    let report = run_backtest(&series, &config(12, 5), &mut source).unwrap();

    assert_eq!(report.equity_curve.len(), 1);
    assert_eq!(report.portfolio.fills().len(), 1);
    let expected_ts = Utc.with_ymd_and_hms(2024, 1, 13, 0, 0, 0).unwrap();
    assert_eq!(report.portfolio.fills()[0].timestamp, expected_ts);
    assert_eq!(report.equity_curve[0].timestamp, expected_ts);
}

#[test]
fn run_with_no_possible_steps_reports_empty_curve() {
    // Start resolves to the final bar: there is no settlement bar left,
    // so zero steps execute — reported, not fatal.
    let mut series = BTreeMap::new();
    series.insert("SYM".to_string(), flat_bars(12, 100.0));

    let report = run_backtest(&series, &config(12, 5), &mut HoldAll).unwrap();
    assert!(report.equity_curve.is_empty());
    assert!(report.portfolio.fills().is_empty());
}

#[test]
fn equity_marks_at_settlement_opens() {
    // Rising opens: buy once, then hold. Equity must track t+1 opens.
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let bars: Vec<Bar> = (0..20)
        .map(|i| {
            let open = 100.0 + i as f64;
            Bar {
                timestamp: base + Duration::days(i as i64),
                open,
                high: open + 2.0,
                low: open - 2.0,
                close: open + 1.0,
                volume: 1_000.0,
            }
        })
        .collect();

    let mut series = BTreeMap::new();
    series.insert("SYM".to_string(), bars);

    let mut source = Scripted::new("SYM", vec![Action::Buy]);
    let report = run_backtest(&series, &config(11, 5), &mut source).unwrap();

    // Start day Jan 11 is index 10; the first step (t=10) settles at
    // bar 11, whose open is 111.
    let fill = &report.portfolio.fills()[0];
    assert_eq!(fill.price, 111.0);
    let size = 1_000.0 / 111.0;

    // Next row (step t=11, hold) marks at bar 12's open = 112.
    let second = &report.equity_curve[1];
    let expected = (10_000.0 - 1_000.0) + size * 112.0;
    assert!((second.equity - expected).abs() < 1e-9);
}
