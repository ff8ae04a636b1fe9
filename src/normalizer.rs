use crate::model::{DailyBar, RawRow, RecordParseError};
use crate::utils::{parse_price, parse_roc_date, parse_thousands};
use tracing::warn;

/// Normalizes a batch of raw rows. A row that fails to parse is dropped on its
/// own; the remaining rows are still returned. The second value is the number
/// of dropped rows.
pub fn normalize_all(instrument: &str, rows: &[RawRow]) -> (Vec<DailyBar>, usize) {
    let mut bars = Vec::with_capacity(rows.len());
    let mut skipped = 0;

    for row in rows {
        match normalize_row(instrument, row) {
            Ok(bar) => bars.push(bar),
            Err(e) => {
                warn!("Skipping row for {} ({:?}): {}", instrument, row.date, e);
                skipped += 1;
            }
        }
    }

    (bars, skipped)
}

pub fn normalize_row(instrument: &str, row: &RawRow) -> Result<DailyBar, RecordParseError> {
    Ok(DailyBar {
        instrument: instrument.to_string(),
        date: parse_roc_date(&row.date)?,
        volume: parse_thousands("volume", &row.volume)?,
        turnover: parse_thousands("turnover", &row.turnover)?,
        open: parse_price("open", &row.open)?,
        high: parse_price("high", &row.high)?,
        low: parse_price("low", &row.low)?,
        close: parse_price("close", &row.close)?,
        price_change: row.change.trim().to_string(),
        transaction_count: parse_thousands("transactions", &row.transactions)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn row(fields: [&str; 9]) -> RawRow {
        RawRow::from_fields(fields.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    #[test]
    fn normalizes_a_full_row() {
        let raw = row([
            "113/05/02", "25,367,811", "20,264,117,354", "793.00", "801.00", "791.00", "800.00",
            "+7.00", "26,510",
        ]);
        let bar = normalize_row("2330", &raw).unwrap();

        assert_eq!(bar.instrument, "2330");
        assert_eq!(bar.date, NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
        assert_eq!(bar.volume, 25_367_811);
        assert_eq!(bar.turnover, 20_264_117_354);
        assert_eq!(bar.open, Some(dec!(793.00)));
        assert_eq!(bar.high, Some(dec!(801)));
        assert_eq!(bar.low, Some(dec!(791)));
        assert_eq!(bar.close, Some(dec!(800)));
        assert_eq!(bar.price_change, "+7.00");
        assert_eq!(bar.transaction_count, 26_510);
    }

    #[test]
    fn sentinel_prices_become_null() {
        let raw = row(["113/05/03", "0", "0", "--", "--", "--", "--", " 0.00", "0"]);
        let bar = normalize_row("1234", &raw).unwrap();
        assert_eq!(bar.open, None);
        assert_eq!(bar.high, None);
        assert_eq!(bar.low, None);
        assert_eq!(bar.close, None);
    }

    #[test]
    fn bad_row_is_skipped_without_aborting_batch() {
        let rows = vec![
            row(["113/05/02", "1,000", "10,000", "10", "11", "9", "10.5", "+0.5", "12"]),
            row(["113/5", "1,000", "10,000", "10", "11", "9", "10.5", "+0.5", "12"]),
            row(["113/05/06", "n/a", "10,000", "10", "11", "9", "10.5", "+0.5", "12"]),
            row(["113/05/07", "2,000", "20,000", "10", "12", "9", "11", "+0.5", "15"]),
        ];
        let (bars, skipped) = normalize_all("2330", &rows);

        assert_eq!(skipped, 2);
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
        assert_eq!(bars[1].date, NaiveDate::from_ymd_opt(2024, 5, 7).unwrap());
    }

    #[test]
    fn wrong_field_count_is_rejected() {
        let fields = vec!["113/05/02".to_string(), "1".to_string()];
        assert_eq!(RawRow::from_fields(fields), Err(RecordParseError::FieldCount(2)));
    }
}
