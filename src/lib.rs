pub mod aggregator;
pub mod analyzer;
pub mod config;
pub mod model;
pub mod normalizer;
pub mod provider;
pub mod service;
pub mod storage;
pub mod sync;
pub mod utils;
pub mod worker;

pub use aggregator::Aggregator;
pub use analyzer::{PatternAnalyzer, SupportResistanceAnalyzer};
pub use config::{load_config, AppConfig};
pub use model::{AnalysisResult, AppError, DailyBar, Period, PeriodBar, SyncReport};
pub use provider::{MarketDataProvider, ProviderChain};
pub use storage::SqliteStorage;
pub use sync::SyncEngine;
pub use worker::{Job, JobOutcome, JobReport, WorkerPool};
