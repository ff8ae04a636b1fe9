use chrono::Local;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use twstock_sniper::worker::{Job, JobOutcome, JobReport, WorkerPool};
use twstock_sniper::{load_config, AppConfig};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("😱 Panic occurred: {:?}", panic_info);
    }));

    let path = std::env::args().nth(1).unwrap_or_else(|| "config.json".to_string());
    let config: Arc<AppConfig> = match load_config(&path) {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            error!("Config load error: {}", e);
            return;
        }
    };

    loop {
        info!("Entering main loop...");
        info!("Instruments to sync: {}", config.instruments.len());

        if !run_cycle(config.clone()).await {
            info!("Interrupted, exiting.");
            break;
        }

        let Some(interval) = config.check_interval_seconds else {
            break;
        };
        info!("Waiting {}s before the next cycle...", interval);
        tokio::select! {
            _ = sleep(Duration::from_secs(interval)) => {
                info!("Timer triggered.");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, exiting.");
                break;
            }
        }
    }
}

/// Syncs every configured instrument, then runs the configured analyses,
/// the summary listing and per-instrument reports. Returns false if
/// interrupted.
async fn run_cycle(config: Arc<AppConfig>) -> bool {
    let (mut pool, mut reports) = WorkerPool::new(config.clone());
    let today = Local::now().date_naive();

    let mut submitted = 0;
    for instrument in &config.instruments {
        pool.submit(Job::Sync {
            instrument: instrument.clone(),
            start: None,
            end: today,
        });
        submitted += 1;
    }
    if !drain(&mut pool, &mut reports, submitted).await {
        return false;
    }

    submitted = 0;
    for request in &config.analyses {
        pool.submit(Job::Analyze {
            instrument: request.instrument.clone(),
            start: request.start,
            end: request.end,
            period: request.period,
        });
        submitted += 1;
    }
    pool.submit(Job::List);
    submitted += 1;
    for instrument in &config.instruments {
        pool.submit(Job::Report {
            instrument: instrument.clone(),
            limit: config.report_limit,
        });
        submitted += 1;
    }
    drain(&mut pool, &mut reports, submitted).await
}

async fn drain(pool: &mut WorkerPool, reports: &mut UnboundedReceiver<JobReport>, expected: usize) -> bool {
    let mut received = 0;
    while received < expected {
        tokio::select! {
            report = reports.recv() => match report {
                Some(report) => {
                    log_report(&report);
                    received += 1;
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                warn!("Received Ctrl+C, aborting {} job(s)...", pool.active());
                pool.abort_all();
                return false;
            }
        }
    }
    pool.join_all().await;
    true
}

fn log_report(report: &JobReport) {
    let outcome = match &report.outcome {
        Ok(outcome) => outcome,
        // already logged by the worker
        Err(_) => return,
    };
    match outcome {
        JobOutcome::Synced(sync) if sync.is_up_to_date() => {
            info!("[#{}] {} is already up to date", report.id, sync.instrument);
        }
        JobOutcome::Synced(sync) => {
            info!(
                "[#{}] {}: {} month(s) requested, {} empty, {} row(s) stored, {} skipped",
                report.id,
                sync.instrument,
                sync.months_requested,
                sync.months_empty,
                sync.rows_upserted,
                sync.rows_skipped
            );
        }
        JobOutcome::Aggregated { instrument, period, bars } => {
            info!("[#{}] {} {}: {} bar(s)", report.id, instrument, period, bars.len());
        }
        JobOutcome::Analyzed { instrument, period, result } => {
            info!(
                "[#{}] {} {} support={} resistance={} consolidation={} touches={}/{} breakout={} breakdown={}",
                report.id,
                instrument,
                period,
                display_level(result.support),
                display_level(result.resistance),
                result.is_consolidation,
                result.support_touches,
                result.resistance_touches,
                result.is_breakout,
                result.is_breakdown
            );
        }
        JobOutcome::Listed(summaries) => {
            info!("[#{}] {} instrument(s) stored", report.id, summaries.len());
            for s in summaries {
                info!(
                    "  {} {}..{} records={} close={:.2}..{:.2}",
                    s.instrument,
                    s.first_date,
                    s.last_date,
                    s.records,
                    s.min_close.unwrap_or_default(),
                    s.max_close.unwrap_or_default()
                );
            }
        }
        JobOutcome::Reported(r) => {
            match &r.stats {
                Some(stats) => info!(
                    "[#{}] {} {}..{} records={} avg close={:.2}",
                    report.id,
                    r.instrument,
                    stats.first_date,
                    stats.last_date,
                    stats.records,
                    stats.avg_close.unwrap_or_default()
                ),
                None => info!("[#{}] {} has no stored data", report.id, r.instrument),
            }
            for bar in &r.latest {
                info!(
                    "  {} close={} volume={} change={}",
                    bar.date,
                    display_level(bar.close),
                    bar.volume,
                    bar.price_change
                );
            }
        }
    }
}

fn display_level(level: Option<rust_decimal::Decimal>) -> String {
    level.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
}
