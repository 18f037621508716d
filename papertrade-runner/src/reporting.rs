//! Equity curve artifact export.

use anyhow::{Context, Result};
use papertrade_core::engine::EquityPoint;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Write the equity curve as a delimited table for offline analysis.
///
/// Columns: RFC 3339 timestamp, equity, cash. Money columns use fixed
/// four-decimal formatting so downstream diffs are stable.
pub fn write_equity_csv(path: &Path, equity: &[EquityPoint]) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("Failed to create equity CSV {}", path.display()))?;
    writeln!(file, "timestamp,equity,cash")?;
    for point in equity {
        writeln!(
            file,
            "{},{:.4},{:.4}",
            point.timestamp.to_rfc3339(),
            point.equity,
            point.cash
        )?;
    }
    Ok(())
}
