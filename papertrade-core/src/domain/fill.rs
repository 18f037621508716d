use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

/// Immutable record of one executed trade.
///
/// Fills are append-only and form the full audit trail: replaying them
/// against the initial cash balance reproduces the ledger exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub side: Side,
    /// Positive base quantity.
    pub size: f64,
    /// Positive execution price.
    pub price: f64,
    /// `size * price` at execution time.
    pub notional_usd: f64,
}
