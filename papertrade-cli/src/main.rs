//! Papertrade CLI — backtest and live paper-trading commands.
//!
//! Commands:
//! - `backtest` — replay historic bars through the decision loop and
//!   write the equity curve artifact
//! - `live` — poll a bar feed on a fixed cadence and paper-trade at the
//!   latest close
//!
//! Both commands run with the built-in `HoldAll` decision source; an
//! external decision process plugs in through the `DecisionSource`
//! trait when this binary is used as a library example.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use papertrade_core::decision::HoldAll;
use papertrade_core::domain::Bar;
use papertrade_runner::config::RunConfig;
use papertrade_runner::data_loader::load_symbol_bars;
use papertrade_runner::live::{BarFeed, LiveSession};
use papertrade_runner::runner::run_historic;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "papertrade",
    about = "Paper-trading simulator — historic backtests and a live polling loop"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay historic bars and write the equity curve artifact.
    Backtest {
        /// Path to a TOML config file.
        #[arg(long, default_value = "papertrade.toml")]
        config: PathBuf,
    },
    /// Poll bars on a fixed cadence and paper-trade at the latest close.
    Live {
        /// Path to a TOML config file.
        #[arg(long, default_value = "papertrade.toml")]
        config: PathBuf,

        /// Stop after this many cycles (default: run forever).
        #[arg(long)]
        max_cycles: Option<u64>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Backtest { config } => run_backtest_cmd(&config),
        Commands::Live { config, max_cycles } => run_live_cmd(&config, max_cycles),
    }
}

fn run_backtest_cmd(config_path: &Path) -> Result<()> {
    let config = RunConfig::load(config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;

    let mut source = HoldAll;
    let outcome = run_historic(&config, &mut source).context("historic run failed")?;

    println!();
    println!("=== Backtest Result ===");
    println!("Run id:        {}", outcome.run_id);
    println!("Equity rows:   {}", outcome.report.equity_curve.len());
    println!("Fills:         {}", outcome.report.portfolio.fills().len());
    if let Some(last) = outcome.report.equity_curve.last() {
        println!("Final equity:  {:.4}", last.equity);
        println!("Final cash:    {:.4}", last.cash);
    }
    println!("Artifact:      {}", outcome.equity_csv.display());
    Ok(())
}

fn run_live_cmd(config_path: &Path, max_cycles: Option<u64>) -> Result<()> {
    let config = RunConfig::load(config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;

    let mut feed = CsvReplayFeed {
        dir: config.data.dir.clone(),
    };
    let mut source = HoldAll;
    let mut session = LiveSession::new(&config);
    session.run(&mut feed, &mut source, max_cycles);

    let portfolio = session.broker().portfolio();
    println!();
    println!("=== Live Session ===");
    println!("Cash:          {:.4}", portfolio.cash_usd());
    println!("Positions:     {}", portfolio.positions().len());
    println!("Fills:         {}", portfolio.fills().len());
    Ok(())
}

/// Feed that re-reads per-symbol CSVs each cycle. Stands in for an
/// exchange connector; useful for local runs against growing files.
struct CsvReplayFeed {
    dir: PathBuf,
}

impl BarFeed for CsvReplayFeed {
    fn fetch_history(&mut self, symbol: &str) -> Result<Vec<Bar>> {
        let bars = load_symbol_bars(&self.dir, symbol)
            .with_context(|| format!("reading bars for {symbol}"))?;
        Ok(bars)
    }
}
