//! Papertrade Runner — orchestration around the core engine.
//!
//! This crate builds on `papertrade-core` to provide:
//! - TOML run configuration with fatal up-front validation
//! - Per-symbol CSV bar loading with timestamp-ordering checks
//! - The historic (backtest) runner and equity artifact export
//! - The live polling loop over the same broker contract

pub mod config;
pub mod data_loader;
pub mod live;
pub mod reporting;
pub mod runner;

pub use config::{ConfigError, RunConfig, RunId};
pub use data_loader::{load_all_bars, load_symbol_bars, LoadError};
pub use live::{BarFeed, LiveSession};
pub use reporting::write_equity_csv;
pub use runner::{run_historic, RunError, RunOutcome};
