// Analyzer module: support/resistance levels and breakout signals.

pub mod levels;
pub mod support_resistance;

pub use support_resistance::{PatternAnalyzer, SupportResistanceAnalyzer};
