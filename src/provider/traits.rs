use crate::model::{ProviderError, RawRow};
use chrono::NaiveDate;

/// A source of daily bars, queried one calendar month at a time.
#[async_trait::async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Fetches every trading day of the month containing `month`.
    /// An empty vector means the provider has no data for that month.
    async fn fetch_month(
        &self,
        instrument: &str,
        month: NaiveDate,
    ) -> Result<Vec<RawRow>, ProviderError>;
}
