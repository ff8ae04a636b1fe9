//! Units of work.
//!
//! Each submitted `Job` runs as its own tokio task with its own storage
//! connection and reports back over an mpsc channel. A job that fails or
//! panics produces an error report; sibling jobs are unaffected.

use crate::config::AppConfig;
use crate::model::{
    AnalysisResult, AppError, InstrumentReport, InstrumentSummary, Period, PeriodBar, SyncReport,
};
use crate::service;
use chrono::NaiveDate;
use futures::future::join_all;
use futures::FutureExt;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};

#[derive(Debug, Clone)]
pub enum Job {
    Sync {
        instrument: String,
        /// Falls back to the configured start date.
        start: Option<NaiveDate>,
        end: NaiveDate,
    },
    Aggregate {
        instrument: String,
        period: Period,
    },
    Analyze {
        instrument: String,
        start: NaiveDate,
        end: NaiveDate,
        period: Period,
    },
    List,
    Report {
        instrument: String,
        limit: u32,
    },
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Job::Sync { instrument, end, .. } => write!(f, "sync {} until {}", instrument, end),
            Job::Aggregate { instrument, period } => write!(f, "aggregate {} {}", instrument, period),
            Job::Analyze {
                instrument,
                start,
                end,
                period,
            } => write!(f, "analyze {} {} {}..{}", instrument, period, start, end),
            Job::List => f.write_str("list"),
            Job::Report { instrument, .. } => write!(f, "report {}", instrument),
        }
    }
}

#[derive(Debug)]
pub enum JobOutcome {
    Synced(SyncReport),
    Aggregated {
        instrument: String,
        period: Period,
        bars: Vec<PeriodBar>,
    },
    Analyzed {
        instrument: String,
        period: Period,
        result: AnalysisResult,
    },
    Listed(Vec<InstrumentSummary>),
    Reported(InstrumentReport),
}

#[derive(Debug)]
pub struct JobReport {
    pub id: u64,
    pub label: String,
    pub outcome: Result<JobOutcome, AppError>,
}

pub struct WorkerPool {
    config: Arc<AppConfig>,
    tx: mpsc::UnboundedSender<JobReport>,
    tasks: Vec<JoinHandle<()>>,
    next_id: u64,
}

impl WorkerPool {
    pub fn new(config: Arc<AppConfig>) -> (Self, mpsc::UnboundedReceiver<JobReport>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let pool = Self {
            config,
            tx,
            tasks: Vec::new(),
            next_id: 1,
        };
        (pool, rx)
    }

    /// Spawns `job` and returns its id; the outcome arrives on the receiver.
    pub fn submit(&mut self, job: Job) -> u64 {
        let id = self.next_id;
        self.next_id += 1;

        let config = self.config.clone();
        let tx = self.tx.clone();
        let label = job.to_string();
        info!("Started job #{} ({})", id, label);

        let handle = tokio::spawn(async move {
            let outcome = AssertUnwindSafe(run_job(config, job))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(AppError::Worker("job panicked".into())));
            if let Err(e) = &outcome {
                error!("Job #{} ({}) failed: {}", id, label, e);
            }
            // The receiver may already be gone during shutdown.
            let _ = tx.send(JobReport { id, label, outcome });
        });
        self.tasks.retain(|t| !t.is_finished());
        self.tasks.push(handle);
        id
    }

    pub fn active(&self) -> usize {
        self.tasks.iter().filter(|t| !t.is_finished()).count()
    }

    /// Cancels every outstanding job. Months already committed by a sync job
    /// stay in storage; the month in flight may be partially applied.
    pub fn abort_all(&mut self) {
        for task in self.tasks.drain(..) {
            if !task.is_finished() {
                info!("Aborting outstanding job");
                task.abort();
            }
        }
    }

    /// Waits for every submitted job to finish.
    pub async fn join_all(&mut self) {
        join_all(self.tasks.drain(..)).await;
    }
}

async fn run_job(config: Arc<AppConfig>, job: Job) -> Result<JobOutcome, AppError> {
    match job {
        Job::Sync {
            instrument,
            start,
            end,
        } => {
            let start = start.unwrap_or(config.start_date);
            let report = service::synchronize(&config, &instrument, start, end).await?;
            Ok(JobOutcome::Synced(report))
        }
        Job::Aggregate { instrument, period } => {
            blocking(move || {
                let bars = service::aggregate(&config, &instrument, period)?;
                Ok(JobOutcome::Aggregated {
                    instrument,
                    period,
                    bars,
                })
            })
            .await
        }
        Job::Analyze {
            instrument,
            start,
            end,
            period,
        } => {
            blocking(move || {
                let result = service::analyze(&config, &instrument, start, end, period)?;
                Ok(JobOutcome::Analyzed {
                    instrument,
                    period,
                    result,
                })
            })
            .await
        }
        Job::List => {
            blocking(move || Ok(JobOutcome::Listed(service::list_summaries(&config)?))).await
        }
        Job::Report { instrument, limit } => {
            blocking(move || {
                Ok(JobOutcome::Reported(service::instrument_report(
                    &config,
                    &instrument,
                    limit,
                )?))
            })
            .await
        }
    }
}

/// Runs storage-only work off the async executor.
async fn blocking<F>(f: F) -> Result<JobOutcome, AppError>
where
    F: FnOnce() -> Result<JobOutcome, AppError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Worker(e.to_string()))?
}
