//! Position sizing — contracts from signal strength and volatility, plus
//! admission control against the global contract cap.
//!
//! Sizers are signal-agnostic: they see a strength number and the bar's ATR,
//! never the conditions that produced the signal.

pub mod contracts;

pub use contracts::ContractSizer;
