//! Domain types for the paper-trading ledger.

pub mod bar;
pub mod fill;
pub mod portfolio;
pub mod position;

pub use bar::Bar;
pub use fill::{Fill, Side};
pub use portfolio::{Portfolio, DUST_EPSILON};
pub use position::Position;
