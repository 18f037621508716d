//! Paper broker — trader-facing intent layer in front of the ledger.
//!
//! Execution is always complete and instantaneous at the supplied price:
//! no order book, no partial fills, no slippage. This is a
//! decision-evaluation harness, not a venue simulator.

use crate::domain::{Portfolio, Side};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Thin wrapper owning one [`Portfolio`] and acting as its sole caller.
///
/// Bad execution inputs (non-positive price, nothing to sell) are silent
/// no-ops rather than errors: a stray price must not crash a
/// long-running simulation or live loop.
#[derive(Debug, Clone)]
pub struct PaperBroker {
    portfolio: Portfolio,
}

impl PaperBroker {
    pub fn new(initial_cash_usd: f64) -> Self {
        Self {
            portfolio: Portfolio::new(initial_cash_usd),
        }
    }

    /// Buy `quote_notional_usd` worth of `symbol` at `price`.
    ///
    /// Available cash is deliberately not checked — sizing and risk
    /// limits are a caller concern, and over-spending surfaces as
    /// negative cash instead of being silently blocked.
    ///
    /// The guards are direction-inverted (`!(x > 0.0)`) so that NaN
    /// prices and sizes fall into the no-op branch with everything else
    /// that is not strictly positive.
    pub fn market_buy(
        &mut self,
        timestamp: DateTime<Utc>,
        symbol: &str,
        quote_notional_usd: f64,
        price: f64,
    ) {
        if !(price > 0.0) {
            tracing::warn!(symbol, price, "skipping buy at invalid price");
            return;
        }
        let size = quote_notional_usd / price;
        if !(size > 0.0) {
            return;
        }
        self.portfolio
            .apply_fill(timestamp, symbol, Side::Buy, size, price);
    }

    /// Liquidate the entire open position in `symbol` at `price`.
    /// No-op when nothing is held or the price is not strictly positive
    /// (NaN included).
    pub fn market_sell_all(&mut self, timestamp: DateTime<Utc>, symbol: &str, price: f64) {
        if !(price > 0.0) {
            tracing::warn!(symbol, price, "skipping sell at invalid price");
            return;
        }
        let size = match self.portfolio.position(symbol) {
            Some(pos) if pos.size > 0.0 => pos.size,
            _ => return,
        };
        self.portfolio
            .apply_fill(timestamp, symbol, Side::Sell, size, price);
    }

    /// Mark-to-market equity at the supplied prices.
    pub fn equity(&self, prices: &HashMap<String, f64>) -> f64 {
        self.portfolio.mark_to_market(prices)
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    /// Hand the final portfolio back to the caller at end of run.
    pub fn into_portfolio(self) -> Portfolio {
        self.portfolio
    }
}
