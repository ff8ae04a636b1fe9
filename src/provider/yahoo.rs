//! Yahoo Finance fallback provider.
//!
//! Queries the v8 chart API for `<code><suffix>` (e.g. `2330.TW`) and rebuilds
//! each day as a primary-venue row. Yahoo does not publish turnover or trade
//! counts, so turnover is approximated as `volume * close` and the trade count
//! is reported as zero.

use super::fetcher::ensure_success;
use super::traits::MarketDataProvider;
use crate::model::{ProviderError, RawRow};
use crate::utils::{format_roc_date, month_end, month_start, UNAVAILABLE};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime};
use reqwest::Client;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

const YAHOO_CHART_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

pub struct YahooProvider {
    client: Client,
    base_url: String,
    suffix: String,
}

impl YahooProvider {
    pub fn new(client: Client, suffix: &str) -> Self {
        Self::with_base_url(client, YAHOO_CHART_URL, suffix)
    }

    pub fn with_base_url(client: Client, base_url: &str, suffix: &str) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
            suffix: suffix.to_string(),
        }
    }

    pub fn symbol(&self, instrument: &str) -> String {
        format!("{}{}", instrument, self.suffix)
    }

    /// Query for the month padded by a day on both sides; rows outside the
    /// month are filtered after converting to exchange-local dates.
    fn query(month: NaiveDate) -> [(&'static str, String); 3] {
        let start = month_start(month) - Duration::days(1);
        let end = month_end(month) + Duration::days(2);
        [
            ("period1", start.and_time(NaiveTime::MIN).and_utc().timestamp().to_string()),
            ("period2", end.and_time(NaiveTime::MIN).and_utc().timestamp().to_string()),
            ("interval", "1d".to_string()),
        ]
    }

    fn parse_response(month: NaiveDate, resp: ChartResponse) -> Result<Vec<RawRow>, ProviderError> {
        let Some(result) = resp.chart.result else {
            return match resp.chart.error {
                Some(err) if err.code == "Not Found" => Ok(Vec::new()),
                Some(err) => Err(ProviderError::Payload(format!(
                    "{}: {}",
                    err.code, err.description
                ))),
                None => Err(ProviderError::Payload("empty result with no error".into())),
            };
        };

        let Some(data) = result.into_iter().next() else {
            return Ok(Vec::new());
        };
        let Some(timestamps) = data.timestamp else {
            debug!("[yahoo] no timestamps for {}", month);
            return Ok(Vec::new());
        };
        let offset = data.meta.map(|m| m.gmtoffset).unwrap_or(0);
        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Payload("no quote data".into()))?;

        let target = month_start(month);
        let mut rows = Vec::new();
        let mut prev_close: Option<Decimal> = None;

        for (i, &ts) in timestamps.iter().enumerate() {
            let date = DateTime::from_timestamp(ts + offset, 0)
                .map(|dt| dt.date_naive())
                .ok_or_else(|| ProviderError::Payload(format!("invalid timestamp: {ts}")))?;
            if month_start(date) != target {
                continue;
            }

            let open = to_decimal(quote.open.get(i).copied().flatten());
            let high = to_decimal(quote.high.get(i).copied().flatten());
            let low = to_decimal(quote.low.get(i).copied().flatten());
            let close = to_decimal(quote.close.get(i).copied().flatten());
            let volume = quote.volume.get(i).copied().flatten();

            // Holidays come back with every field empty.
            if open.is_none() && high.is_none() && low.is_none() && close.is_none() && volume.is_none() {
                continue;
            }

            let volume = volume.unwrap_or(0);
            let turnover = close
                .and_then(|c| (Decimal::from(volume) * c).round().to_i64())
                .unwrap_or(0);
            let change = match (close, prev_close) {
                (Some(c), Some(p)) => format_change(c - p),
                _ => "0.00".to_string(),
            };
            if close.is_some() {
                prev_close = close;
            }

            rows.push(RawRow {
                date: format_roc_date(date),
                volume: volume.to_string(),
                turnover: turnover.to_string(),
                open: format_price(open),
                high: format_price(high),
                low: format_price(low),
                close: format_price(close),
                change,
                transactions: "0".to_string(),
            });
        }

        Ok(rows)
    }
}

fn to_decimal(value: Option<f64>) -> Option<Decimal> {
    value
        .filter(|v| v.is_finite())
        .and_then(Decimal::from_f64)
        .map(|d| d.round_dp(2))
}

fn format_price(value: Option<Decimal>) -> String {
    match value {
        Some(mut d) => {
            d.rescale(2);
            d.to_string()
        }
        None => UNAVAILABLE.to_string(),
    }
}

fn format_change(mut diff: Decimal) -> String {
    diff.rescale(2);
    if diff > Decimal::ZERO {
        format!("+{}", diff)
    } else if diff < Decimal::ZERO {
        diff.to_string()
    } else {
        "0.00".to_string()
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo"
    }

    async fn fetch_month(
        &self,
        instrument: &str,
        month: NaiveDate,
    ) -> Result<Vec<RawRow>, ProviderError> {
        let url = format!("{}/{}", self.base_url, self.symbol(instrument));
        let response = self
            .client
            .get(&url)
            .query(&Self::query(month))
            .send()
            .await?;
        let resp: ChartResponse = ensure_success(response)?.json().await?;
        Self::parse_response(month, resp)
    }
}
