use super::queries;
use crate::model::{DailyBar, InstrumentStats, InstrumentSummary, StorageError};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// How long a connection waits on a lock held by a sibling unit of work.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// One private connection to the bar table. Each unit of work opens its own.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens the database at `db_path` and makes sure the schema exists.
    pub fn new(db_path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(db_path)?;
        Self::init(conn)
    }

    pub fn in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(queries::CREATE_SCHEMA)?;
        Ok(Self { conn })
    }

    /// Inserts or replaces every bar keyed by (instrument, date), committed as
    /// a single transaction.
    pub fn upsert_bars(&mut self, bars: &[DailyBar]) -> Result<usize, StorageError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(queries::UPSERT_BAR)?;
            for bar in bars {
                stmt.execute(params![
                    &bar.instrument,
                    &bar.date,
                    &bar.volume,
                    &bar.turnover,
                    bar.open.map(|d| d.to_string()),
                    bar.high.map(|d| d.to_string()),
                    bar.low.map(|d| d.to_string()),
                    bar.close.map(|d| d.to_string()),
                    &bar.price_change,
                    &bar.transaction_count,
                ])?;
            }
        }
        tx.commit()?;
        debug!("Committed {} bars", bars.len());
        Ok(bars.len())
    }

    /// Latest stored date for an instrument, if any.
    pub fn max_date(&self, instrument: &str) -> Result<Option<NaiveDate>, StorageError> {
        let mut stmt = self.conn.prepare_cached(queries::MAX_DATE)?;
        let date = stmt.query_row(params![instrument], |row| row.get::<_, Option<NaiveDate>>(0))?;
        Ok(date)
    }

    /// Bars with `start <= date <= end`, ascending.
    pub fn select_range(
        &self,
        instrument: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>, StorageError> {
        let mut stmt = self.conn.prepare_cached(queries::SELECT_RANGE)?;
        let bars = stmt
            .query_map(params![instrument, start, end], Self::map_bar)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(bars)
    }

    pub fn select_all(&self, instrument: &str) -> Result<Vec<DailyBar>, StorageError> {
        let mut stmt = self.conn.prepare_cached(queries::SELECT_ALL)?;
        let bars = stmt
            .query_map(params![instrument], Self::map_bar)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(bars)
    }

    /// Most recent `limit` bars, newest first.
    pub fn latest(&self, instrument: &str, limit: u32) -> Result<Vec<DailyBar>, StorageError> {
        let mut stmt = self.conn.prepare_cached(queries::SELECT_LATEST)?;
        let bars = stmt
            .query_map(params![instrument, limit], Self::map_bar)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(bars)
    }

    pub fn instrument_stats(&self, instrument: &str) -> Result<Option<InstrumentStats>, StorageError> {
        let mut stmt = self.conn.prepare_cached(queries::INSTRUMENT_STATS)?;
        let stats = stmt.query_row(params![instrument], |row| {
            let first: Option<NaiveDate> = row.get(0)?;
            let last: Option<NaiveDate> = row.get(1)?;
            Ok(match (first, last) {
                (Some(first_date), Some(last_date)) => Some(InstrumentStats {
                    first_date,
                    last_date,
                    records: row.get(2)?,
                    min_close: row.get(3)?,
                    max_close: row.get(4)?,
                    avg_close: row.get(5)?,
                }),
                _ => None,
            })
        })?;
        Ok(stats)
    }

    /// One summary line per stored instrument, ordered by code.
    pub fn summaries(&self) -> Result<Vec<InstrumentSummary>, StorageError> {
        let mut stmt = self.conn.prepare_cached(queries::SUMMARIES)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(InstrumentSummary {
                    instrument: row.get(0)?,
                    first_date: row.get(1)?,
                    last_date: row.get(2)?,
                    records: row.get(3)?,
                    min_close: row.get(4)?,
                    max_close: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn map_bar(row: &Row) -> Result<DailyBar, rusqlite::Error> {
        Ok(DailyBar {
            instrument: row.get(0)?,
            date: row.get(1)?,
            volume: row.get(2)?,
            turnover: row.get(3)?,
            open: Self::decimal_column(row, 4)?,
            high: Self::decimal_column(row, 5)?,
            low: Self::decimal_column(row, 6)?,
            close: Self::decimal_column(row, 7)?,
            price_change: row.get(8)?,
            transaction_count: row.get(9)?,
        })
    }

    fn decimal_column(row: &Row, idx: usize) -> Result<Option<Decimal>, rusqlite::Error> {
        let text: Option<String> = row.get(idx)?;
        text.map(|s| {
            Decimal::from_str(&s).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
            })
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn bar(instrument: &str, date: NaiveDate, close: Option<Decimal>) -> DailyBar {
        DailyBar {
            instrument: instrument.to_string(),
            date,
            open: Some(dec!(10.00)),
            high: Some(dec!(11.50)),
            low: Some(dec!(9.25)),
            close,
            volume: 1_000,
            turnover: 10_500,
            transaction_count: 7,
            price_change: "+0.50".to_string(),
        }
    }

    #[test]
    fn upsert_is_idempotent_and_replaces() {
        let mut storage = SqliteStorage::in_memory().unwrap();
        let d = ymd(2024, 5, 2);

        storage.upsert_bars(&[bar("2330", d, Some(dec!(10.5)))]).unwrap();
        storage.upsert_bars(&[bar("2330", d, Some(dec!(10.5)))]).unwrap();
        assert_eq!(storage.select_all("2330").unwrap().len(), 1);

        storage.upsert_bars(&[bar("2330", d, Some(dec!(10.75)))]).unwrap();
        let all = storage.select_all("2330").unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].close, Some(dec!(10.75)));
    }

    #[test]
    fn decimals_and_nulls_round_trip_exactly() {
        let mut storage = SqliteStorage::in_memory().unwrap();
        let original = bar("2330", ymd(2024, 5, 2), None);
        storage.upsert_bars(&[original.clone()]).unwrap();

        let loaded = storage.select_all("2330").unwrap();
        assert_eq!(loaded, vec![original]);
        assert_eq!(loaded[0].open.unwrap().to_string(), "10.00");
    }

    #[test]
    fn max_date_and_ranges() {
        let mut storage = SqliteStorage::in_memory().unwrap();
        assert_eq!(storage.max_date("2330").unwrap(), None);

        let dates = [ymd(2024, 5, 6), ymd(2024, 5, 2), ymd(2024, 6, 3)];
        let bars: Vec<_> = dates.iter().map(|d| bar("2330", *d, Some(dec!(10)))).collect();
        storage.upsert_bars(&bars).unwrap();
        storage.upsert_bars(&[bar("0050", ymd(2024, 7, 1), Some(dec!(150)))]).unwrap();

        assert_eq!(storage.max_date("2330").unwrap(), Some(ymd(2024, 6, 3)));

        let may = storage.select_range("2330", ymd(2024, 5, 1), ymd(2024, 5, 31)).unwrap();
        let may_dates: Vec<_> = may.iter().map(|b| b.date).collect();
        assert_eq!(may_dates, vec![ymd(2024, 5, 2), ymd(2024, 5, 6)]);

        let latest = storage.latest("2330", 2).unwrap();
        assert_eq!(latest[0].date, ymd(2024, 6, 3));
        assert_eq!(latest.len(), 2);
    }

    #[test]
    fn stats_and_summaries() {
        let mut storage = SqliteStorage::in_memory().unwrap();
        assert!(storage.instrument_stats("2330").unwrap().is_none());
        assert!(storage.summaries().unwrap().is_empty());

        storage
            .upsert_bars(&[
                bar("2330", ymd(2024, 5, 2), Some(dec!(10))),
                bar("2330", ymd(2024, 5, 3), Some(dec!(20))),
                bar("0050", ymd(2024, 5, 3), Some(dec!(150))),
            ])
            .unwrap();

        let stats = storage.instrument_stats("2330").unwrap().unwrap();
        assert_eq!(stats.records, 2);
        assert_eq!(stats.first_date, ymd(2024, 5, 2));
        assert_eq!(stats.last_date, ymd(2024, 5, 3));
        assert_eq!(stats.min_close, Some(10.0));
        assert_eq!(stats.max_close, Some(20.0));
        assert_eq!(stats.avg_close, Some(15.0));

        let summaries = storage.summaries().unwrap();
        let codes: Vec<_> = summaries.iter().map(|s| s.instrument.as_str()).collect();
        assert_eq!(codes, vec!["0050", "2330"]);
        assert_eq!(summaries[1].records, 2);
    }
}
