//! Papertrade Core — paper-trading ledger and bar-sequenced backtest engine.
//!
//! This crate contains the accounting-critical heart of the simulator:
//! - Domain types (bars, fills, positions, portfolio)
//! - Single-writer ledger with weighted-average cost accounting
//! - Paper broker translating trader intents into fills
//! - Decision model with a guaranteed-safe fallback at the adapter boundary
//! - Bar-by-bar backtest driver that settles every decision at the next
//!   bar's open (no lookahead)
//!
//! Everything here is synchronous, single-threaded, and deterministic.
//! Data loading, configuration, and the live polling loop live in
//! `papertrade-runner`.

pub mod broker;
pub mod decision;
pub mod domain;
pub mod engine;
