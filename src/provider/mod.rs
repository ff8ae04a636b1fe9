// Market data providers and the fallback chain over them.

pub mod chain;
pub mod fetcher;
pub mod tpex;
pub mod traits;
pub mod twse;
pub mod yahoo;

pub use chain::{MonthFetch, ProviderChain};
pub use fetcher::build_client;
pub use tpex::TpexProvider;
pub use traits::MarketDataProvider;
pub use twse::TwseProvider;
pub use yahoo::YahooProvider;
