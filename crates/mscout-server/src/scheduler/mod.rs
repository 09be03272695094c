//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! recurring queue-drain, hygiene, and rate-refresh jobs.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use mscout_core::AppConfig;
use mscout_pricing::{ExchangeRateCache, RateStore};
use mscout_worker::JobRunner;

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process — dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    config: Arc<AppConfig>,
    runner: JobRunner,
    rates: Arc<RateStore>,
    exchange: Arc<ExchangeRateCache>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_drain_job(&scheduler, pool.clone(), Arc::clone(&config), runner).await?;
    register_sweep_job(&scheduler, pool.clone(), Arc::clone(&config)).await?;
    register_rates_job(&scheduler, rates, exchange).await?;
    register_prune_job(&scheduler, pool, config).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the queue drain: every minute, claim and run pending jobs
/// oldest-first.
async fn register_drain_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    config: Arc<AppConfig>,
    runner: JobRunner,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);

    let job = Job::new_async("0 * * * * *", move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let config = Arc::clone(&config);
        let runner = runner.clone();

        Box::pin(async move {
            drain_queue(&pool, &config, &runner).await;
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

async fn drain_queue(pool: &PgPool, config: &AppConfig, runner: &JobRunner) {
    let pending = match mscout_db::list_pending_jobs(pool, config.queue_drain_limit).await {
        Ok(jobs) => jobs,
        Err(e) => {
            tracing::error!(error = %e, "scheduler: failed to list pending jobs");
            return;
        }
    };

    if pending.is_empty() {
        return;
    }

    tracing::info!(count = pending.len(), "scheduler: draining job queue");

    let timeout = Duration::from_secs(config.worker_job_timeout_secs);
    for job in pending {
        match tokio::time::timeout(timeout, runner.run(job.id)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!(job_id = %job.public_id, error = %e, "scheduler: job failed");
            }
            Err(_) => {
                // The abandoned PROCESSING row is picked up by the stale
                // sweep, which marks it FAILED.
                tracing::error!(
                    job_id = %job.public_id,
                    timeout_secs = config.worker_job_timeout_secs,
                    "scheduler: job timed out"
                );
            }
        }
    }
}

/// Register the hygiene sweep: every 10 minutes, fail PROCESSING jobs that
/// stopped making progress and PENDING jobs nothing ever picked up.
async fn register_sweep_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    config: Arc<AppConfig>,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);

    let job = Job::new_async("0 */10 * * * *", move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let config = Arc::clone(&config);

        Box::pin(async move {
            match mscout_db::sweep_stale_processing(&pool, config.job_stale_after_mins).await {
                Ok(n) if n > 0 => {
                    tracing::warn!(count = n, "scheduler: failed stale processing jobs");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(error = %e, "scheduler: stale-processing sweep failed");
                }
            }

            match mscout_db::fail_stale_pending(&pool, config.pending_retention_mins).await {
                Ok(n) if n > 0 => {
                    tracing::warn!(count = n, "scheduler: failed expired pending jobs");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(error = %e, "scheduler: pending sweep failed");
                }
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// Register the daily rate refresh at 09:00 UTC: force a fresh exchange
/// rate and re-read the shipping rate blob, so a table installed by the
/// CLI is picked up without a restart.
async fn register_rates_job(
    scheduler: &JobScheduler,
    rates: Arc<RateStore>,
    exchange: Arc<ExchangeRateCache>,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async("0 0 9 * * *", move |_uuid, _lock| {
        let rates = Arc::clone(&rates);
        let exchange = Arc::clone(&exchange);

        Box::pin(async move {
            match exchange.refresh().await {
                Ok(rate) => {
                    tracing::info!(krw_per_jpy = %rate, "scheduler: exchange rate refreshed");
                }
                Err(e) => {
                    // Best effort; the cache falls back on the next read.
                    tracing::warn!(error = %e, "scheduler: exchange rate refresh failed");
                }
            }

            if let Err(e) = rates.reload() {
                tracing::error!(error = %e, "scheduler: shipping rate reload failed");
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// Register the daily prune at midnight UTC: drop FAILED jobs past the
/// retention window.
async fn register_prune_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    config: Arc<AppConfig>,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);

    let job = Job::new_async("0 0 0 * * *", move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let config = Arc::clone(&config);

        Box::pin(async move {
            match mscout_db::prune_failed_jobs(&pool, config.failed_retention_hours).await {
                Ok(n) if n > 0 => {
                    tracing::info!(count = n, "scheduler: pruned failed jobs");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(error = %e, "scheduler: prune failed");
                }
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}
