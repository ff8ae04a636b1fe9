use crate::config::AppConfig;
use crate::model::{AppError, ProviderError, RawRow};
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::warn;

/// Builds the HTTP client shared by all providers of one unit of work.
/// Without `http_timeout_secs` the transport default applies.
pub fn build_client(config: &AppConfig) -> Result<Client, AppError> {
    let mut builder = Client::builder().user_agent(config.user_agent.clone());
    if let Some(secs) = config.http_timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder.build().map_err(|e| AppError::Client(e.to_string()))
}

/// Rejects non-2xx responses so callers can treat them as "no data".
pub(crate) fn ensure_success(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ProviderError::Status(status.as_u16()));
    }
    Ok(response)
}

/// Converts tabular string rows into `RawRow`s, dropping malformed ones.
pub(crate) fn collect_rows(provider: &str, rows: Vec<Vec<String>>) -> Vec<RawRow> {
    rows.into_iter()
        .filter_map(|fields| match RawRow::from_fields(fields) {
            Ok(row) => Some(row),
            Err(e) => {
                warn!("[{}] dropping row: {}", provider, e);
                None
            }
        })
        .collect()
}
