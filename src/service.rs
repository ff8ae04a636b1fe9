// Entry points of the core. Every call opens its own storage connection.
use crate::aggregator::Aggregator;
use crate::analyzer::{PatternAnalyzer, SupportResistanceAnalyzer};
use crate::config::AppConfig;
use crate::model::{
    AnalysisResult, AppError, InstrumentReport, InstrumentSummary, Period, PeriodBar, SyncReport,
};
use crate::provider::{build_client, ProviderChain};
use crate::storage::SqliteStorage;
use crate::sync::SyncEngine;
use chrono::NaiveDate;

/// Downloads and stores bars for `instrument` from its sync cursor up to `end`.
pub async fn synchronize(
    config: &AppConfig,
    instrument: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<SyncReport, AppError> {
    let storage = SqliteStorage::new(&config.db_path)?;
    let chain = ProviderChain::from_config(config, build_client(config)?);
    let engine = SyncEngine::new(chain, storage, config.fetch_delay());
    Ok(engine.synchronize(instrument, start, end).await?)
}

pub fn aggregate(config: &AppConfig, instrument: &str, period: Period) -> Result<Vec<PeriodBar>, AppError> {
    let storage = SqliteStorage::new(&config.db_path)?;
    aggregate_stored(&storage, instrument, period)
}

pub fn aggregate_stored(
    storage: &SqliteStorage,
    instrument: &str,
    period: Period,
) -> Result<Vec<PeriodBar>, AppError> {
    let bars = storage.select_all(instrument)?;
    Ok(Aggregator::aggregate(&bars, period))
}

pub fn analyze(
    config: &AppConfig,
    instrument: &str,
    window_start: NaiveDate,
    window_end: NaiveDate,
    period: Period,
) -> Result<AnalysisResult, AppError> {
    let storage = SqliteStorage::new(&config.db_path)?;
    analyze_stored(&storage, instrument, window_start, window_end, period)
}

/// Aggregates the whole stored series, then analyzes the bars whose bucket
/// date falls inside the window. A reversed window selects nothing and gives
/// the neutral result.
pub fn analyze_stored(
    storage: &SqliteStorage,
    instrument: &str,
    window_start: NaiveDate,
    window_end: NaiveDate,
    period: Period,
) -> Result<AnalysisResult, AppError> {
    let bars = aggregate_stored(storage, instrument, period)?;
    Ok(SupportResistanceAnalyzer::new().analyze(&bars, window_start, window_end))
}

pub fn list_summaries(config: &AppConfig) -> Result<Vec<InstrumentSummary>, AppError> {
    let storage = SqliteStorage::new(&config.db_path)?;
    Ok(storage.summaries()?)
}

/// Latest `limit` bars (newest first) and overall statistics.
pub fn instrument_report(
    config: &AppConfig,
    instrument: &str,
    limit: u32,
) -> Result<InstrumentReport, AppError> {
    let storage = SqliteStorage::new(&config.db_path)?;
    Ok(InstrumentReport {
        instrument: instrument.to_string(),
        latest: storage.latest(instrument, limit)?,
        stats: storage.instrument_stats(instrument)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DailyBar;
    use rust_decimal_macros::dec;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seeded() -> SqliteStorage {
        let mut storage = SqliteStorage::in_memory().unwrap();
        let bars: Vec<DailyBar> = (6..=10)
            .map(|day| DailyBar {
                instrument: "2330".to_string(),
                date: ymd(2024, 5, day),
                open: Some(dec!(10)),
                high: Some(dec!(12) + rust_decimal::Decimal::from(day)),
                low: Some(dec!(8)),
                close: Some(dec!(11)),
                volume: 100,
                turnover: 1100,
                transaction_count: 3,
                price_change: "+1.00".to_string(),
            })
            .collect();
        storage.upsert_bars(&bars).unwrap();
        storage
    }

    #[test]
    fn daily_aggregate_is_strictly_ascending() {
        let storage = seeded();
        let daily = aggregate_stored(&storage, "2330", Period::Daily).unwrap();
        assert_eq!(daily.len(), 5);
        assert!(daily.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn analyze_over_weekly_bars() {
        let storage = seeded();
        let r = analyze_stored(&storage, "2330", ymd(2024, 5, 6), ymd(2024, 5, 6), Period::Weekly)
            .unwrap();
        assert_eq!(r.support, Some(dec!(8)));
        assert_eq!(r.resistance, Some(dec!(22)));
        assert!(r.is_consolidation);
    }

    #[test]
    fn reversed_window_is_an_empty_window() {
        let storage = seeded();
        let r = analyze_stored(&storage, "2330", ymd(2024, 5, 10), ymd(2024, 5, 6), Period::Daily)
            .unwrap();
        assert_eq!(r, AnalysisResult::default());
    }

    #[test]
    fn unknown_instrument_gives_empty_analysis() {
        let storage = seeded();
        let r = analyze_stored(&storage, "9999", ymd(2024, 5, 1), ymd(2024, 5, 31), Period::Daily)
            .unwrap();
        assert_eq!(r, AnalysisResult::default());
    }
}
