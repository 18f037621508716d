//! Portfolio — the single-writer paper-trading ledger.
//!
//! Cash and positions are mutated by exactly one code path,
//! [`Portfolio::apply_fill`]. Everything else is a read. The fields are
//! private so the module boundary enforces that discipline; the fill log
//! alone is a complete audit trail of the ledger.

use super::fill::{Fill, Side};
use super::position::Position;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Position sizes at or below this are treated as zero and removed.
///
/// Keeps repeated buy/sell-all cycles from leaving floating-point dust
/// entries behind in the position map.
pub const DUST_EPSILON: f64 = 1e-12;

/// Aggregate ledger state: cash, open positions, and the append-only
/// fill log.
///
/// Created once per run with an explicit starting balance — there is no
/// default capital. Cash may go negative if a caller over-spends; sizing
/// is a caller responsibility and the ledger records what happened rather
/// than blocking it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    cash_usd: f64,
    initial_cash_usd: f64,
    positions: BTreeMap<String, Position>,
    fills: Vec<Fill>,
}

impl Portfolio {
    pub fn new(initial_cash_usd: f64) -> Self {
        Self {
            cash_usd: initial_cash_usd,
            initial_cash_usd,
            positions: BTreeMap::new(),
            fills: Vec::new(),
        }
    }

    /// Apply one fill to the ledger. The only mutator.
    ///
    /// Preconditions (guarded by the broker): `size > 0`, `price > 0`.
    ///
    /// Buys debit cash and blend the weighted-average entry price; sells
    /// credit cash and shrink the position, removing it entirely once the
    /// remaining size is at or below [`DUST_EPSILON`]. Realized P&L is
    /// implicit in the cash delta. Every call appends exactly one fill.
    pub fn apply_fill(
        &mut self,
        timestamp: DateTime<Utc>,
        symbol: &str,
        side: Side,
        size: f64,
        price: f64,
    ) {
        debug_assert!(size > 0.0, "fill size must be positive");
        debug_assert!(price > 0.0, "fill price must be positive");

        let notional = size * price;
        match side {
            Side::Buy => {
                self.cash_usd -= notional;
                let pos = self.positions.entry(symbol.to_string()).or_insert(Position {
                    symbol: symbol.to_string(),
                    size: 0.0,
                    avg_price: 0.0,
                });
                let new_size = pos.size + size;
                pos.avg_price = if new_size != 0.0 {
                    (pos.size * pos.avg_price + notional) / new_size
                } else {
                    price
                };
                pos.size = new_size;
            }
            Side::Sell => {
                self.cash_usd += notional;
                if let Some(pos) = self.positions.get_mut(symbol) {
                    pos.size -= size;
                    if pos.size <= DUST_EPSILON {
                        self.positions.remove(symbol);
                    }
                }
            }
        }

        self.fills.push(Fill {
            timestamp,
            symbol: symbol.to_string(),
            side,
            size,
            price,
            notional_usd: notional,
        });
    }

    /// Total equity: cash plus each open position marked at the supplied
    /// price. A held symbol with no supplied price is marked at its own
    /// `avg_price` — degrade gracefully, not an error.
    pub fn mark_to_market(&self, prices: &HashMap<String, f64>) -> f64 {
        let position_value: f64 = self
            .positions
            .values()
            .map(|pos| {
                let price = prices.get(&pos.symbol).copied().unwrap_or(pos.avg_price);
                pos.market_value(price)
            })
            .sum();
        self.cash_usd + position_value
    }

    pub fn cash_usd(&self) -> f64 {
        self.cash_usd
    }

    pub fn initial_cash_usd(&self) -> f64 {
        self.initial_cash_usd
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn positions(&self) -> &BTreeMap<String, Position> {
        &self.positions
    }

    /// Full audit trail, in application order.
    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }
}
