use crate::model::{DailyBar, Period, PeriodBar};
use crate::utils::{month_start, week_start};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

/// Resamples stored daily bars into daily, weekly or monthly bars.
pub struct Aggregator;

impl Aggregator {
    /// Output is ordered by bucket date; empty input gives empty output.
    pub fn aggregate(bars: &[DailyBar], period: Period) -> Vec<PeriodBar> {
        if bars.is_empty() {
            return Vec::new();
        }

        let result: Vec<PeriodBar> = match period {
            Period::Daily => {
                let mut daily: Vec<PeriodBar> = bars.iter().cloned().map(PeriodBar::daily).collect();
                daily.sort_by_key(|b| b.date);
                daily
            }
            Period::Weekly => Self::group_by(bars, week_start)
                .into_iter()
                .map(|(start, records)| Self::aggregate_ohlcv(Period::Weekly, start, records))
                .collect(),
            Period::Monthly => Self::group_by(bars, month_start)
                .into_iter()
                .map(|(start, records)| Self::aggregate_ohlcv(Period::Monthly, start, records))
                .collect(),
        };

        debug!("Aggregated {} daily bars into {} {} bars", bars.len(), result.len(), period);
        result
    }

    fn group_by(
        bars: &[DailyBar],
        bucket: fn(NaiveDate) -> NaiveDate,
    ) -> BTreeMap<NaiveDate, Vec<&DailyBar>> {
        let mut buckets: BTreeMap<NaiveDate, Vec<&DailyBar>> = BTreeMap::new();
        for bar in bars {
            buckets.entry(bucket(bar.date)).or_default().push(bar);
        }
        buckets
    }

    /// Open from the earliest day, close from the latest, extreme high/low,
    /// summed volume, turnover and trade count. Null highs/lows are ignored;
    /// a null open or close on the boundary day stays null.
    fn aggregate_ohlcv(period: Period, start: NaiveDate, mut records: Vec<&DailyBar>) -> PeriodBar {
        records.sort_by_key(|b| b.date);
        let first = records[0];
        let last = records[records.len() - 1];

        PeriodBar {
            period,
            instrument: first.instrument.clone(),
            date: start,
            open: first.open,
            high: records.iter().filter_map(|b| b.high).max(),
            low: records.iter().filter_map(|b| b.low).min(),
            close: last.close,
            volume: records.iter().map(|b| b.volume).sum(),
            turnover: records.iter().map(|b| b.turnover).sum(),
            transaction_count: records.iter().map(|b| b.transaction_count).sum(),
            price_change: String::new(),
        }
    }
}
