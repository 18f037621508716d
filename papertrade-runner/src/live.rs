//! Live (streaming) paper trading loop.
//!
//! Same ledger and broker contract as the backtest, with one
//! difference: there is no future bar to settle against, so decisions
//! execute at the latest observed close. The loop is a plain
//! synchronous poll-sleep cycle; transient feed or adapter trouble is
//! logged and the next cycle proceeds with an untouched ledger.

use papertrade_core::broker::PaperBroker;
use papertrade_core::decision::{Action, DecisionSource};
use papertrade_core::domain::Bar;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::config::RunConfig;

/// Source of streaming bar history, one series per symbol.
///
/// Implementations talk to an exchange or replay fixtures; errors are
/// per-symbol and per-cycle, never fatal to the loop.
pub trait BarFeed {
    fn fetch_history(&mut self, symbol: &str) -> anyhow::Result<Vec<Bar>>;
}

/// One live paper-trading session: a broker plus the trading parameters
/// it runs under.
pub struct LiveSession {
    broker: PaperBroker,
    symbols: Vec<String>,
    lookback: usize,
    order_notional_usd: f64,
    poll_interval: Duration,
}

impl LiveSession {
    pub fn new(config: &RunConfig) -> Self {
        let t = &config.trading;
        Self {
            broker: PaperBroker::new(t.initial_cash_usd),
            symbols: t.symbols.clone(),
            lookback: t.lookback_bars,
            order_notional_usd: t.order_notional_usd,
            poll_interval: Duration::from_secs(t.poll_interval_secs),
        }
    }

    /// Execute one poll-decide-execute cycle.
    ///
    /// A symbol whose fetch fails (or returns nothing) is dropped for
    /// this cycle only: it gets no window, no price, and therefore no
    /// fill. Returns the number of fills applied this cycle.
    pub fn run_cycle(&mut self, feed: &mut dyn BarFeed, source: &mut dyn DecisionSource) -> usize {
        let mut history: BTreeMap<String, Vec<Bar>> = BTreeMap::new();
        let mut last_bars: HashMap<String, Bar> = HashMap::new();

        for symbol in &self.symbols {
            match feed.fetch_history(symbol) {
                Ok(bars) if !bars.is_empty() => {
                    let tail_start = bars.len().saturating_sub(self.lookback);
                    let last = bars.last().cloned().expect("non-empty");
                    history.insert(symbol.clone(), bars[tail_start..].to_vec());
                    last_bars.insert(symbol.clone(), last);
                }
                Ok(_) => {
                    tracing::warn!(symbol = %symbol, "feed returned no bars, skipping symbol");
                }
                Err(err) => {
                    tracing::error!(symbol = %symbol, %err, "failed to fetch bars, skipping symbol");
                }
            }
        }

        if history.is_empty() {
            tracing::warn!("no data this cycle");
            return 0;
        }

        let windows: BTreeMap<String, &[Bar]> = history
            .iter()
            .map(|(sym, bars)| (sym.clone(), bars.as_slice()))
            .collect();
        let decisions = source.decide(&windows);

        let fills_before = self.broker.portfolio().fills().len();
        for asset in &decisions.assets {
            let Some(last) = last_bars.get(&asset.symbol) else {
                continue;
            };
            let price = last.close;
            // Feeds are not forced through bar validation, so the close
            // may be NaN; the inverted guard drops that case as well.
            if !(price > 0.0) {
                continue;
            }
            match asset.action {
                Action::Buy => self.broker.market_buy(
                    last.timestamp,
                    &asset.symbol,
                    self.order_notional_usd,
                    price,
                ),
                Action::Sell => self.broker.market_sell_all(last.timestamp, &asset.symbol, price),
                Action::Hold => {}
            }
        }
        let fills_applied = self.broker.portfolio().fills().len() - fills_before;

        let marks: HashMap<String, f64> = last_bars
            .iter()
            .map(|(sym, bar)| (sym.clone(), bar.close))
            .collect();
        tracing::info!(
            equity = self.broker.equity(&marks),
            cash = self.broker.portfolio().cash_usd(),
            positions = self.broker.portfolio().positions().len(),
            fills = fills_applied,
            "cycle complete"
        );

        fills_applied
    }

    /// Poll forever (or for `max_cycles`), sleeping between cycles.
    /// Interrupting between cycles leaves the ledger fully consistent.
    pub fn run(
        &mut self,
        feed: &mut dyn BarFeed,
        source: &mut dyn DecisionSource,
        max_cycles: Option<u64>,
    ) {
        let mut cycle = 0u64;
        loop {
            self.run_cycle(feed, source);
            cycle += 1;
            if let Some(max) = max_cycles {
                if cycle >= max {
                    return;
                }
            }
            std::thread::sleep(self.poll_interval);
        }
    }

    pub fn broker(&self) -> &PaperBroker {
        &self.broker
    }
}
