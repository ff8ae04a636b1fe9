// Core structs: DailyBar, PeriodBar, RawRow, AnalysisResult
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Exchange ticker, e.g. "2330". Partition key of every stored series.
pub type InstrumentCode = String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyBar {
    pub instrument: InstrumentCode,
    pub date: NaiveDate,
    pub open: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub close: Option<Decimal>,
    pub volume: i64,
    pub turnover: i64,
    pub transaction_count: i64,
    pub price_change: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Period::Daily => "daily",
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
        };
        f.write_str(s)
    }
}

impl FromStr for Period {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" | "d" => Ok(Period::Daily),
            "weekly" | "w" => Ok(Period::Weekly),
            "monthly" | "m" => Ok(Period::Monthly),
            other => Err(AppError::InvalidRequest(format!("unknown period '{}'", other))),
        }
    }
}

/// A bar over a daily, weekly or monthly bucket. `date` is the bucket start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodBar {
    pub period: Period,
    pub instrument: InstrumentCode,
    pub date: NaiveDate,
    pub open: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub close: Option<Decimal>,
    pub volume: i64,
    pub turnover: i64,
    pub transaction_count: i64,
    pub price_change: String,
}

impl PeriodBar {
    pub fn daily(bar: DailyBar) -> Self {
        Self {
            period: Period::Daily,
            instrument: bar.instrument,
            date: bar.date,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            turnover: bar.turnover,
            transaction_count: bar.transaction_count,
            price_change: bar.price_change,
        }
    }
}

/// One provider row in the primary venue's layout. Every field is the raw,
/// thousand-separated text; `--` marks an unavailable price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub date: String,
    pub volume: String,
    pub turnover: String,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub change: String,
    pub transactions: String,
}

impl RawRow {
    pub const FIELD_COUNT: usize = 9;

    pub fn from_fields(fields: Vec<String>) -> Result<Self, RecordParseError> {
        if fields.len() != Self::FIELD_COUNT {
            return Err(RecordParseError::FieldCount(fields.len()));
        }
        let mut it = fields.into_iter();
        let mut next = || it.next().unwrap_or_default();
        Ok(Self {
            date: next(),
            volume: next(),
            turnover: next(),
            open: next(),
            high: next(),
            low: next(),
            close: next(),
            change: next(),
            transactions: next(),
        })
    }
}

/// Support/resistance levels and signals over one analysis window.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnalysisResult {
    pub support: Option<Decimal>,
    pub resistance: Option<Decimal>,
    pub is_consolidation: bool,
    pub support_touches: usize,
    pub resistance_touches: usize,
    pub is_breakout: bool,
    pub is_breakdown: bool,
}

/// Outcome of synchronizing one instrument.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub instrument: InstrumentCode,
    pub cursor: Option<NaiveDate>,
    pub months_requested: usize,
    pub months_empty: usize,
    pub rows_upserted: usize,
    pub rows_skipped: usize,
}

impl SyncReport {
    pub fn is_up_to_date(&self) -> bool {
        self.months_requested == 0
    }
}

/// One line of the database overview.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentSummary {
    pub instrument: InstrumentCode,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub records: i64,
    pub min_close: Option<f64>,
    pub max_close: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentStats {
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub records: i64,
    pub min_close: Option<f64>,
    pub max_close: Option<f64>,
    pub avg_close: Option<f64>,
}

/// Latest rows plus statistics for a single instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentReport {
    pub instrument: InstrumentCode,
    pub latest: Vec<DailyBar>,
    pub stats: Option<InstrumentStats>,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("malformed payload: {0}")]
    Payload(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ProviderError::Payload(e.to_string())
        } else {
            ProviderError::Http(e.to_string())
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordParseError {
    #[error("expected 9 fields, got {0}")]
    FieldCount(usize),
    #[error("invalid date '{0}'")]
    Date(String),
    #[error("invalid {field} value '{value}'")]
    Number { field: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    DatabaseError(String),
    #[error("corrupt stored value: {0}")]
    Corrupt(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        StorageError::DatabaseError(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("HTTP client error: {0}")]
    Client(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("worker failed: {0}")]
    Worker(String),
}
