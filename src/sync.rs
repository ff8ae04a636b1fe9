use crate::model::{DailyBar, StorageError, SyncReport};
use crate::normalizer::normalize_all;
use crate::provider::ProviderChain;
use crate::storage::SqliteStorage;
use crate::utils::{month_start, next_month};
use chrono::{Duration, NaiveDate};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{info, warn};

/// Where the next run resumes: the day after the newest stored bar, or
/// `start` when nothing is stored yet.
pub fn sync_cursor(max_stored: Option<NaiveDate>, start: NaiveDate) -> NaiveDate {
    match max_stored {
        Some(last) => last + Duration::days(1),
        None => start,
    }
}

/// Incremental month-by-month downloader. The only writer of bar rows.
pub struct SyncEngine {
    chain: ProviderChain,
    storage: Arc<Mutex<SqliteStorage>>,
    delay: std::time::Duration,
}

impl SyncEngine {
    pub fn new(chain: ProviderChain, storage: SqliteStorage, delay: std::time::Duration) -> Self {
        Self {
            chain,
            storage: Arc::new(Mutex::new(storage)),
            delay,
        }
    }

    pub fn storage(&self) -> Arc<Mutex<SqliteStorage>> {
        self.storage.clone()
    }

    pub async fn cursor(&self, instrument: &str, start: NaiveDate) -> Result<NaiveDate, StorageError> {
        let max_stored = self.storage.lock().await.max_date(instrument)?;
        Ok(sync_cursor(max_stored, start))
    }

    /// Walks months from the sync cursor's month through `end`'s month. A month
    /// with no data from any provider is skipped; a storage failure aborts the
    /// run but months already committed stay committed.
    pub async fn synchronize(
        &self,
        instrument: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<SyncReport, StorageError> {
        let cursor = self.cursor(instrument, start).await?;
        let mut report = SyncReport {
            instrument: instrument.to_string(),
            cursor: Some(cursor),
            ..SyncReport::default()
        };

        if month_start(cursor) > month_start(end) {
            info!("Data for {} is already up to date (cursor {})", instrument, cursor);
            return Ok(report);
        }
        info!("Synchronizing {} from {} to {}", instrument, cursor, end);

        let last_month = month_start(end);
        let mut month = month_start(cursor);
        while month <= last_month {
            report.months_requested += 1;

            match self.chain.fetch_month(instrument, month).await {
                Some(fetched) => {
                    let (bars, skipped) = normalize_all(instrument, &fetched.rows);
                    let stored = self.store_month(bars).await?;
                    report.rows_skipped += skipped;
                    report.rows_upserted += stored;
                    info!(
                        "{} {}: stored {} bars from {} ({} skipped)",
                        instrument,
                        month.format("%Y-%m"),
                        stored,
                        fetched.provider,
                        skipped
                    );
                }
                None => {
                    warn!("{} {}: no provider had data", instrument, month.format("%Y-%m"));
                    report.months_empty += 1;
                }
            }

            if !self.delay.is_zero() {
                sleep(self.delay).await;
            }
            month = next_month(month);
        }

        info!(
            "Finished {}: {} months, {} bars stored, {} rows skipped, {} empty months",
            instrument,
            report.months_requested,
            report.rows_upserted,
            report.rows_skipped,
            report.months_empty
        );
        Ok(report)
    }

    /// Commits one month's bars off the async executor.
    async fn store_month(&self, bars: Vec<DailyBar>) -> Result<usize, StorageError> {
        let storage = self.storage.clone();
        tokio::task::spawn_blocking(move || storage.blocking_lock().upsert_bars(&bars))
            .await
            .map_err(|e| StorageError::DatabaseError(format!("upsert task failed: {}", e)))?
    }
}
