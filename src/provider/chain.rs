use super::traits::MarketDataProvider;
use super::{TpexProvider, TwseProvider, YahooProvider};
use crate::config::{AppConfig, ProviderKind};
use crate::model::RawRow;
use chrono::NaiveDate;
use reqwest::Client;
use tracing::{debug, info, warn};

/// Rows for one month together with the provider that supplied them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthFetch {
    pub provider: String,
    pub rows: Vec<RawRow>,
}

/// Ordered list of providers. The first non-empty answer wins; results are
/// never merged across providers.
pub struct ProviderChain {
    providers: Vec<Box<dyn MarketDataProvider>>,
}

impl ProviderChain {
    pub fn new(providers: Vec<Box<dyn MarketDataProvider>>) -> Self {
        Self { providers }
    }

    pub fn from_config(config: &AppConfig, client: Client) -> Self {
        let providers = config
            .providers
            .iter()
            .map(|kind| -> Box<dyn MarketDataProvider> {
                match kind {
                    ProviderKind::Twse => Box::new(TwseProvider::new(client.clone())),
                    ProviderKind::Tpex => Box::new(TpexProvider::new(client.clone())),
                    ProviderKind::Yahoo => {
                        Box::new(YahooProvider::new(client.clone(), &config.yahoo_suffix))
                    }
                }
            })
            .collect();
        Self::new(providers)
    }

    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Returns `None` when every provider came back empty or failed.
    /// Failures are logged and treated as empty; there is no retry.
    pub async fn fetch_month(&self, instrument: &str, month: NaiveDate) -> Option<MonthFetch> {
        for provider in &self.providers {
            match provider.fetch_month(instrument, month).await {
                Ok(rows) if !rows.is_empty() => {
                    info!(
                        "[{}] {} rows for {} {}",
                        provider.name(),
                        rows.len(),
                        instrument,
                        month.format("%Y-%m")
                    );
                    return Some(MonthFetch {
                        provider: provider.name().to_string(),
                        rows,
                    });
                }
                Ok(_) => {
                    debug!(
                        "[{}] no data for {} {}",
                        provider.name(),
                        instrument,
                        month.format("%Y-%m")
                    );
                }
                Err(e) => {
                    warn!(
                        "[{}] unavailable for {} {}: {}",
                        provider.name(),
                        instrument,
                        month.format("%Y-%m"),
                        e
                    );
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProviderError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    enum Answer {
        Rows(usize),
        Empty,
        Fail,
    }

    struct Scripted {
        name: &'static str,
        answer: Answer,
        calls: Arc<AtomicUsize>,
    }

    fn row(day: u32) -> RawRow {
        RawRow {
            date: format!("113/05/{:02}", day),
            volume: "1".into(),
            turnover: "1".into(),
            open: "1".into(),
            high: "1".into(),
            low: "1".into(),
            close: "1".into(),
            change: "0".into(),
            transactions: "1".into(),
        }
    }

    #[async_trait::async_trait]
    impl MarketDataProvider for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch_month(&self, _: &str, _: NaiveDate) -> Result<Vec<RawRow>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.answer {
                Answer::Rows(n) => Ok((1..=n as u32).map(row).collect()),
                Answer::Empty => Ok(Vec::new()),
                Answer::Fail => Err(ProviderError::Status(503)),
            }
        }
    }

    fn chain(script: Vec<(&'static str, Answer)>) -> (ProviderChain, Vec<Arc<AtomicUsize>>) {
        let mut counters = Vec::new();
        let providers = script
            .into_iter()
            .map(|(name, answer)| {
                let calls = Arc::new(AtomicUsize::new(0));
                counters.push(calls.clone());
                Box::new(Scripted { name, answer, calls }) as Box<dyn MarketDataProvider>
            })
            .collect();
        (ProviderChain::new(providers), counters)
    }

    fn may() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[tokio::test]
    async fn first_non_empty_provider_wins() {
        let (chain, calls) = chain(vec![
            ("a", Answer::Rows(2)),
            ("b", Answer::Rows(5)),
        ]);
        let fetched = chain.fetch_month("2330", may()).await.unwrap();
        assert_eq!(fetched.provider, "a");
        assert_eq!(fetched.rows.len(), 2);
        assert_eq!(calls[1].load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failures_and_empties_fall_through() {
        let (chain, calls) = chain(vec![
            ("a", Answer::Fail),
            ("b", Answer::Empty),
            ("c", Answer::Rows(3)),
        ]);
        let fetched = chain.fetch_month("2330", may()).await.unwrap();
        assert_eq!(fetched.provider, "c");
        assert_eq!(fetched.rows.len(), 3);
        assert!(calls.iter().all(|c| c.load(Ordering::SeqCst) == 1));
    }

    #[tokio::test]
    async fn all_empty_is_none() {
        let (chain, _) = chain(vec![("a", Answer::Empty), ("b", Answer::Fail)]);
        assert!(chain.fetch_month("2330", may()).await.is_none());
    }

    #[test]
    fn config_order_is_preserved() {
        let cfg = AppConfig {
            providers: vec![ProviderKind::Yahoo, ProviderKind::Twse],
            ..AppConfig::default()
        };
        let chain = ProviderChain::from_config(&cfg, Client::new());
        assert_eq!(chain.names(), vec!["yahoo", "twse"]);
    }
}
