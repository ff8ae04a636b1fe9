use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Lower and upper multipliers of the ±1% touch band.
pub const TOUCH_BAND_LOWER: Decimal = dec!(0.99);
pub const TOUCH_BAND_UPPER: Decimal = dec!(1.01);

/// Inclusive `[level * 0.99, level * 1.01]`, computed in exact decimal.
pub fn touch_band(level: Decimal) -> (Decimal, Decimal) {
    (level * TOUCH_BAND_LOWER, level * TOUCH_BAND_UPPER)
}

pub fn count_touches(closes: &[Option<Decimal>], level: Decimal) -> usize {
    let (lo, hi) = touch_band(level);
    closes
        .iter()
        .flatten()
        .filter(|c| **c >= lo && **c <= hi)
        .count()
}

pub fn lowest(values: impl Iterator<Item = Option<Decimal>>) -> Option<Decimal> {
    values.flatten().min()
}

pub fn highest(values: impl Iterator<Item = Option<Decimal>>) -> Option<Decimal> {
    values.flatten().max()
}
