// Taiwan Stock Exchange STOCK_DAY report
use super::fetcher::{collect_rows, ensure_success};
use super::traits::MarketDataProvider;
use crate::model::{ProviderError, RawRow};
use crate::utils::month_start;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

const TWSE_URL: &str = "https://www.twse.com.tw/exchangeReport/STOCK_DAY";

#[derive(Debug, Deserialize)]
struct StockDayResponse {
    stat: String,
    #[serde(default)]
    data: Vec<Vec<String>>,
}

pub struct TwseProvider {
    client: Client,
    base_url: String,
}

impl TwseProvider {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, TWSE_URL)
    }

    pub fn with_base_url(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
        }
    }

    fn query(instrument: &str, month: NaiveDate) -> [(&'static str, String); 3] {
        [
            ("response", "json".to_string()),
            ("date", month_start(month).format("%Y%m%d").to_string()),
            ("stockNo", instrument.to_string()),
        ]
    }

    fn parse_body(body: &str) -> Result<Vec<RawRow>, ProviderError> {
        let resp: StockDayResponse =
            serde_json::from_str(body).map_err(|e| ProviderError::Payload(e.to_string()))?;
        if resp.stat != "OK" {
            debug!("[twse] stat = {:?}", resp.stat);
            return Ok(Vec::new());
        }
        Ok(collect_rows("twse", resp.data))
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for TwseProvider {
    fn name(&self) -> &str {
        "twse"
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
