use super::levels::{count_touches, highest, lowest};
use crate::model::{AnalysisResult, PeriodBar};
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Trait defining the interface for a bar-window analyzer.
pub trait PatternAnalyzer {
    fn analyze(&self, bars: &[PeriodBar], window_start: NaiveDate, window_end: NaiveDate) -> AnalysisResult;
}

/// Support = lowest low, resistance = highest high over the window.
///
/// `is_consolidation` checks every close against those same extremes, so for
/// well-formed bars (low <= close <= high) it is always true; it only turns
/// false when a bar is internally inconsistent or has no close.
pub struct SupportResistanceAnalyzer;

impl SupportResistanceAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SupportResistanceAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternAnalyzer for SupportResistanceAnalyzer {
    fn analyze(&self, bars: &[PeriodBar], window_start: NaiveDate, window_end: NaiveDate) -> AnalysisResult {
        let window: Vec<&PeriodBar> = bars
            .iter()
            .filter(|b| b.date >= window_start && b.date <= window_end)
            .collect();

        let support = lowest(window.iter().map(|b| b.low));
        let resistance = highest(window.iter().map(|b| b.high));

        let (Some(s), Some(r)) = (support, resistance) else {
            return AnalysisResult {
                support,
                resistance,
                ..AnalysisResult::default()
            };
        };

        let closes: Vec<Option<Decimal>> = window.iter().map(|b| b.close).collect();

        AnalysisResult {
            support,
            resistance,
            is_consolidation: closes.iter().all(|c| matches!(c, Some(c) if *c >= s && *c <= r)),
            support_touches: count_touches(&closes, s),
            resistance_touches: count_touches(&closes, r),
            is_breakout: closes.iter().flatten().any(|c| *c > r),
            is_breakdown: closes.iter().flatten().any(|c| *c < s),
        }
    }
}
