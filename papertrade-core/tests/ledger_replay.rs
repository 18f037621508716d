//! Property tests for ledger invariants.
//!
//! Uses proptest to verify:
//! 1. Replay — re-applying the fill log to a fresh ledger with the same
//!    starting cash reproduces the exact final state
//! 2. Weighted-average cost — avg price after any buy sequence equals
//!    sum(size*price) / sum(size), independent of order
//! 3. Sell-all above dust always removes the position entry

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use papertrade_core::domain::{Portfolio, Side, DUST_EPSILON};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_size() -> impl Strategy<Value = f64> {
    (0.01..1000.0_f64).prop_map(|q| (q * 100.0).round() / 100.0)
}

fn arb_price() -> impl Strategy<Value = f64> {
    (1.0..500.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_side() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Buy), Just(Side::Sell)]
}

fn arb_symbol() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("BTC/USDT"), Just("ETH/USDT"), Just("SOL/USDT")]
}

proptest! {
    /// Replaying the full fill log from the initial cash balance must
    /// reproduce cash and every position's size and avg price exactly.
    #[test]
    fn replay_reproduces_final_state(
        ops in prop::collection::vec((arb_symbol(), arb_side(), arb_size(), arb_price()), 1..40),
        initial_cash in 1_000.0..100_000.0_f64,
    ) {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();

        let mut ledger = Portfolio::new(initial_cash);
        for (symbol, side, size, price) in &ops {
            ledger.apply_fill(ts, symbol, *side, *size, *price);
        }

        let mut replayed = Portfolio::new(initial_cash);
        for fill in ledger.fills() {
            replayed.apply_fill(fill.timestamp, &fill.symbol, fill.side, fill.size, fill.price);
        }

        prop_assert_eq!(replayed.cash_usd(), ledger.cash_usd());
        prop_assert_eq!(replayed.positions().len(), ledger.positions().len());
        for (symbol, pos) in ledger.positions() {
            let r = replayed.position(symbol).expect("replayed position missing");
            prop_assert_eq!(r.size, pos.size);
            prop_assert_eq!(r.avg_price, pos.avg_price);
        }
        prop_assert_eq!(replayed.fills().len(), ledger.fills().len());
    }

    /// avg price after n buys equals the notional-weighted mean of the
    /// fill prices.
    #[test]
    fn weighted_average_identity(
        buys in prop::collection::vec((arb_size(), arb_price()), 1..20),
    ) {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let mut ledger = Portfolio::new(1_000_000.0);
        for (size, price) in &buys {
            ledger.apply_fill(ts, "SYM", Side::Buy, *size, *price);
        }

        let total_size: f64 = buys.iter().map(|(s, _)| s).sum();
        let total_notional: f64 = buys.iter().map(|(s, p)| s * p).sum();
        let expected = total_notional / total_size;

        let pos = ledger.position("SYM").unwrap();
        prop_assert!((pos.size - total_size).abs() < 1e-9);
        prop_assert!(
            (pos.avg_price - expected).abs() < 1e-6,
            "avg {} != expected {}", pos.avg_price, expected
        );
    }

    /// The weighted average does not depend on the order of the buys.
    #[test]
    fn weighted_average_is_order_independent(
        buys in prop::collection::vec((arb_size(), arb_price()), 2..20),
    ) {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();

        let mut forward = Portfolio::new(1_000_000.0);
        for (size, price) in &buys {
            forward.apply_fill(ts, "SYM", Side::Buy, *size, *price);
        }

        let mut backward = Portfolio::new(1_000_000.0);
        for (size, price) in buys.iter().rev() {
            backward.apply_fill(ts, "SYM", Side::Buy, *size, *price);
        }

        let f = forward.position("SYM").unwrap();
        let b = backward.position("SYM").unwrap();
        prop_assert!((f.avg_price - b.avg_price).abs() < 1e-6);
        prop_assert!((f.size - b.size).abs() < 1e-9);
    }

    /// Selling an entire position above the dust epsilon always removes
    /// the map entry.
    #[test]
    fn full_sell_removes_position(
        size in arb_size(),
        buy_price in arb_price(),
        sell_price in arb_price(),
    ) {
        prop_assume!(size > DUST_EPSILON);
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();

        let mut ledger = Portfolio::new(1_000_000.0);
        ledger.apply_fill(ts, "SYM", Side::Buy, size, buy_price);
        ledger.apply_fill(ts, "SYM", Side::Sell, size, sell_price);

        prop_assert!(ledger.position("SYM").is_none());
    }
}
