// Utility functions: ROC calendar dates, thousand-separated numbers, month arithmetic
use crate::model::RecordParseError;
use chrono::{Datelike, Duration, Months, NaiveDate};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Offset between ROC (Minguo) years and Gregorian years.
pub const ROC_YEAR_OFFSET: i32 = 1911;

/// Sentinel used by the exchanges for a price that was not traded.
pub const UNAVAILABLE: &str = "--";

/// Parses a ROC date such as `113/05/01` into 2024-05-01.
/// TPEx marks some days with a trailing `*`, which is ignored.
pub fn parse_roc_date(text: &str) -> Result<NaiveDate, RecordParseError> {
    let cleaned = text.trim().trim_end_matches(['*', '＊']).trim();
    let err = || RecordParseError::Date(text.to_string());

    let parts: Vec<&str> = cleaned.split('/').collect();
    if parts.len() != 3 {
        return Err(err());
    }
    let year: i32 = parts[0].trim().parse().map_err(|_| err())?;
    let month: u32 = parts[1].trim().parse().map_err(|_| err())?;
    let day: u32 = parts[2].trim().parse().map_err(|_| err())?;

    let year = year.checked_add(ROC_YEAR_OFFSET).ok_or_else(err)?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(err)
}

/// Formats a date the way the exchanges print it: `113/05/01`.
pub fn format_roc_date(date: NaiveDate) -> String {
    format!(
        "{}/{:02}/{:02}",
        date.year() - ROC_YEAR_OFFSET,
        date.month(),
        date.day()
    )
}

/// Parses an integer field like `12,345,678`.
pub fn parse_thousands(field: &'static str, text: &str) -> Result<i64, RecordParseError> {
    let cleaned = text.trim().replace(',', "");
    cleaned.parse::<i64>().map_err(|_| RecordParseError::Number {
        field,
        value: text.to_string(),
    })
}

/// Parses a price field; the `--` sentinel becomes `None`, never zero.
pub fn parse_price(field: &'static str, text: &str) -> Result<Option<Decimal>, RecordParseError> {
    let trimmed = text.trim();
    if trimmed == UNAVAILABLE {
        return Ok(None);
    }
    let cleaned = trimmed.replace(',', "");
    Decimal::from_str(&cleaned)
        .map(Some)
        .map_err(|_| RecordParseError::Number {
            field,
            value: text.to_string(),
        })
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.day0() as i64)
}

/// First day of the calendar month after `date`.
pub fn next_month(date: NaiveDate) -> NaiveDate {
    month_start(date)
        .checked_add_months(Months::new(1))
        .unwrap_or(NaiveDate::MAX)
}

pub fn month_end(date: NaiveDate) -> NaiveDate {
    next_month(date) - Duration::days(1)
}

/// Monday of the ISO week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}
