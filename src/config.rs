use crate::model::{AppError, Period};
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Twse,
    Tpex,
    Yahoo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisRequest {
    pub instrument: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(default)]
    pub period: Period,
}

/// Immutable application settings, shared by every unit of work.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,
    /// Pause between monthly provider requests.
    #[serde(default = "default_fetch_delay_ms")]
    pub fetch_delay_ms: u64,
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderKind>,
    #[serde(default = "default_yahoo_suffix")]
    pub yahoo_suffix: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    pub http_timeout_secs: Option<u64>,
    #[serde(default)]
    pub instruments: Vec<String>,
    #[serde(default)]
    pub analyses: Vec<AnalysisRequest>,
    #[serde(default = "default_report_limit")]
    pub report_limit: u32,
    pub check_interval_seconds: Option<u64>,
}

impl AppConfig {
    pub fn fetch_delay(&self) -> Duration {
        Duration::from_millis(self.fetch_delay_ms)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            start_date: default_start_date(),
            fetch_delay_ms: default_fetch_delay_ms(),
            providers: default_providers(),
            yahoo_suffix: default_yahoo_suffix(),
            user_agent: default_user_agent(),
            http_timeout_secs: None,
            instruments: Vec::new(),
            analyses: Vec::new(),
            report_limit: default_report_limit(),
            check_interval_seconds: None,
        }
    }
}

fn default_db_path() -> String {
    "stock_data.db".to_string()
}

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2010, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn default_fetch_delay_ms() -> u64 {
    3000
}

fn default_providers() -> Vec<ProviderKind> {
    vec![ProviderKind::Twse, ProviderKind::Tpex, ProviderKind::Yahoo]
}

fn default_yahoo_suffix() -> String {
    ".TW".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) TwStockSniper/0.1".to_string()
}

fn default_report_limit() -> u32 {
    10
}

pub fn load_config(path: &str) -> Result<AppConfig, AppError> {
    let content = fs::read_to_string(path).map_err(|e| AppError::Config(format!("{}: {}", path, e)))?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<AppConfig, AppError> {
    let config: AppConfig =
        serde_json::from_str(content).map_err(|e| AppError::Config(e.to_string()))?;
    if config.providers.is_empty() {
        return Err(AppError::Config("at least one provider must be enabled".into()));
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let cfg = parse_config("{}").unwrap();
        assert_eq!(cfg.db_path, "stock_data.db");
        assert_eq!(cfg.start_date, NaiveDate::from_ymd_opt(2010, 1, 1).unwrap());
        assert_eq!(cfg.fetch_delay(), Duration::from_secs(3));
        assert_eq!(
            cfg.providers,
            vec![ProviderKind::Twse, ProviderKind::Tpex, ProviderKind::Yahoo]
        );
        assert!(cfg.http_timeout_secs.is_none());
    }

    #[test]
    fn parses_instruments_and_analyses() {
        let cfg = parse_config(
            r#"{
                "db_path": "/tmp/x.db",
                "providers": ["yahoo", "twse"],
                "instruments": ["2330", "0050"],
                "analyses": [
                    {"instrument": "2330", "start": "2014-12-01", "end": "2015-03-01", "period": "weekly"},
                    {"instrument": "0050", "start": "2020-01-01", "end": "2020-12-31"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(cfg.providers, vec![ProviderKind::Yahoo, ProviderKind::Twse]);
        assert_eq!(cfg.instruments, vec!["2330", "0050"]);
        assert_eq!(cfg.analyses[0].period, Period::Weekly);
        assert_eq!(cfg.analyses[1].period, Period::Daily);
    }

    #[test]
    fn rejects_empty_provider_list() {
        assert!(matches!(
            parse_config(r#"{"providers": []}"#),
            Err(AppError::Config(_))
        ));
    }
}
