//! Decision model — the shape of the external decision source's output
//! and the validation boundary that keeps malformed responses out of the
//! engine.
//!
//! The engine never parses LLM output itself: it consumes a
//! [`DecisionSet`] and assumes it is well formed. Anything that talks to
//! an external model goes through [`DecisionSet::parse_lossy`] (or
//! equivalent), which maps every failure mode to the safe all-HOLD /
//! all-NO_TRADE response instead of raising.

use crate::domain::Bar;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-symbol action. Wire format matches the external JSON contract
/// (`"BUY"`, `"SELL"`, `"HOLD"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

/// Per-pair action. Advisory only: the engine records but never executes
/// spread trades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PairAction {
    LongSpread,
    ShortSpread,
    NoTrade,
}

/// One symbol's decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetDecision {
    pub symbol: String,
    pub action: Action,
    /// Advisory confidence in `[0, 1]`. Never scales order size.
    pub confidence: f64,
    #[serde(default)]
    pub comment: String,
}

/// One unordered symbol pair's decision, e.g. `"BTC/USDT vs ETH/USDT"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairDecision {
    pub pair: String,
    pub action: PairAction,
    pub confidence: f64,
    #[serde(default)]
    pub comment: String,
}

/// The complete joint decision for one step across all symbols.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionSet {
    pub assets: Vec<AssetDecision>,
    pub pairs: Vec<PairDecision>,
}

impl DecisionSet {
    /// The guaranteed-safe fallback: HOLD every symbol, NO_TRADE every
    /// unordered pair.
    pub fn hold_all<S: AsRef<str>>(symbols: &[S]) -> Self {
        let assets = symbols
            .iter()
            .map(|s| AssetDecision {
                symbol: s.as_ref().to_string(),
                action: Action::Hold,
                confidence: 0.0,
                comment: "fallback".to_string(),
            })
            .collect();

        let mut pairs = Vec::new();
        for i in 0..symbols.len() {
            for j in (i + 1)..symbols.len() {
                pairs.push(PairDecision {
                    pair: format!("{} vs {}", symbols[i].as_ref(), symbols[j].as_ref()),
                    action: PairAction::NoTrade,
                    confidence: 0.0,
                    comment: "fallback".to_string(),
                });
            }
        }

        Self { assets, pairs }
    }

    /// Validate a raw external response at the adapter boundary.
    ///
    /// Strips Markdown code fences, parses JSON into the decision shape,
    /// and clamps confidences into `[0, 1]`. Any parse or shape failure
    /// (including unknown action strings) degrades to
    /// [`DecisionSet::hold_all`] — this function cannot fail.
    pub fn parse_lossy<S: AsRef<str>>(raw: &str, symbols: &[S]) -> Self {
        let cleaned = strip_code_fences(raw);
        match serde_json::from_str::<DecisionSet>(&cleaned) {
            Ok(mut set) => {
                for asset in &mut set.assets {
                    asset.confidence = asset.confidence.clamp(0.0, 1.0);
                }
                for pair in &mut set.pairs {
                    pair.confidence = pair.confidence.clamp(0.0, 1.0);
                }
                set
            }
            Err(err) => {
                tracing::warn!(%err, "malformed decision response, falling back to hold-all");
                Self::hold_all(symbols)
            }
        }
    }
}

/// Remove Markdown fence lines (``` and a bare "json" tag) that chat
/// models habitually wrap JSON in.
fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    trimmed
        .lines()
        .filter(|line| {
            let l = line.trim();
            !l.starts_with("```") && !l.eq_ignore_ascii_case("json")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// A pluggable decision source: given per-symbol lookback windows, return
/// one joint decision set.
///
/// Implementations are infallible by contract — whatever can go wrong
/// inside (network, model, parsing) must be absorbed into the hold-all
/// fallback before crossing this boundary.
pub trait DecisionSource {
    fn decide(&mut self, windows: &BTreeMap<String, &[Bar]>) -> DecisionSet;
}

/// Trivial source that holds everything. Useful as a stand-in while
/// wiring a real adapter, and as the do-nothing baseline in tests.
#[derive(Debug, Default, Clone)]
pub struct HoldAll;

impl DecisionSource for HoldAll {
    fn decide(&mut self, windows: &BTreeMap<String, &[Bar]>) -> DecisionSet {
        let symbols: Vec<&String> = windows.keys().collect();
        DecisionSet::hold_all(&symbols)
    }
}
