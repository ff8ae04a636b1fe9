// Taipei Exchange (OTC) daily trading info
use super::fetcher::{collect_rows, ensure_success};
use super::traits::MarketDataProvider;
use crate::model::{ProviderError, RawRow};
use crate::utils::{parse_thousands, ROC_YEAR_OFFSET};
use chrono::{Datelike, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

const TPEX_URL: &str =
    "https://www.tpex.org.tw/web/stock/aftertrading/daily_trading_info/st43_result.php";

/// TPEx reports volume and turnover in thousands.
const UNIT_SCALE: i64 = 1000;

#[derive(Debug, Deserialize)]
struct St43Response {
    #[serde(rename = "aaData", default)]
    aa_data: Vec<Vec<String>>,
}

pub struct TpexProvider {
    client: Client,
    base_url: String,
}

impl TpexProvider {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, TPEX_URL)
    }

    pub fn with_base_url(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
        }
    }

    fn query(instrument: &str, month: NaiveDate) -> [(&'static str, String); 3] {
        [
            ("l", "zh-tw".to_string()),
            (
                "d",
                format!("{}/{:02}", month.year() - ROC_YEAR_OFFSET, month.month()),
            ),
            ("stkno", instrument.to_string()),
        ]
    }

    fn parse_body(body: &str) -> Result<Vec<RawRow>, ProviderError> {
        let resp: St43Response =
            serde_json::from_str(body).map_err(|e| ProviderError::Payload(e.to_string()))?;
        Ok(collect_rows("tpex", resp.aa_data)
            .into_iter()
            .filter_map(|row| {
                let date = row.date.clone();
                let remapped = Self::remap(row);
                if remapped.is_none() {
                    warn!("[tpex] dropping row {}: volume or turnover out of range", date);
                }
                remapped
            })
            .collect())
    }

    /// Brings a TPEx row to the TWSE layout: dates lose their `*` marker and
    /// share/amount counts are expanded from thousands.
    /// `None` when a scaled count no longer fits in an `i64`.
    fn remap(mut row: RawRow) -> Option<RawRow> {
        row.date = row.date.trim().trim_end_matches(['*', '＊']).to_string();
        row.volume = scale_thousands("volume", &row.volume)?;
        row.turnover = scale_thousands("turnover", &row.turnover)?;
        Some(row)
    }
}

// Unparseable values are passed through so the normalizer rejects the row.
fn scale_thousands(field: &'static str, value: &str) -> Option<String> {
    match parse_thousands(field, value) {
        Ok(n) => n.checked_mul(UNIT_SCALE).map(|scaled| scaled.to_string()),
        Err(_) => Some(value.to_string()),
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for TpexProvider {
    fn name(&self) -> &str {
        "tpex"
    }

    async fn fetch_month(
        &self,
        instrument: &str,
        month: NaiveDate,
    ) -> Result<Vec<RawRow>, ProviderError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&Self::query(instrument, month))
            .send()
            .await?;
        let body = ensure_success(response)?.text().await?;
        Self::parse_body(&body)
    }
}
