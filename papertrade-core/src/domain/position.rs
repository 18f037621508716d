use serde::{Deserialize, Serialize};

/// One open position. Long-only: `size >= 0` always.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    /// Base quantity held. Strictly above the dust epsilon while the
    /// position exists in the portfolio map.
    pub size: f64,
    /// Weighted average entry price, strictly positive while held.
    pub avg_price: f64,
}

impl Position {
    pub fn market_value(&self, current_price: f64) -> f64 {
        self.size * current_price
    }

    pub fn unrealized_pnl(&self, current_price: f64) -> f64 {
        self.size * (current_price - self.avg_price)
    }
}
