//! Pure computation for commission amounts and earnings totals. No I/O.

pub mod calculator;
pub mod earnings;

pub use calculator::{calculate, CalculationError};
pub use earnings::summarize_amounts;
