//! Job execution: claims queued collection jobs and walks their items.
//!
//! Per-item failures are recorded and skipped rather than propagated so a
//! single bad listing does not abort the whole job. Only failures that
//! leave the job itself in doubt (settings, persistence) fail the job.

mod items;

use std::sync::Arc;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use sqlx::PgPool;

use mscout_core::{ItemResult, JobSettings, JobType};
use mscout_db::{claim_job, complete_job, fail_job, force_fail_job, get_job, record_item_result};
use mscout_pricing::{ExchangeRateCache, RateStore};
use mscout_scraper::ScraperClient;

/// Runs collection jobs against a shared pool, collector client, and
/// pricing state. Cheap to clone; one instance serves all workers.
#[derive(Clone)]
pub struct JobRunner {
    pool: PgPool,
    scraper: Arc<ScraperClient>,
    rates: Arc<RateStore>,
    exchange: Arc<ExchangeRateCache>,
    inter_item_delay: Duration,
}

impl JobRunner {
    #[must_use]
    pub fn new(
        pool: PgPool,
        scraper: Arc<ScraperClient>,
        rates: Arc<RateStore>,
        exchange: Arc<ExchangeRateCache>,
        inter_item_delay: Duration,
    ) -> Self {
        Self {
            pool,
            scraper,
            rates,
            exchange,
            inter_item_delay,
        }
    }

    /// Executes one job end to end.
    ///
    /// A missing job and a lost claim race are both quiet no-ops: the queue
    /// is shared, and someone else handling the job is a normal outcome.
    ///
    /// # Errors
    ///
    /// Returns an error when the job failed fatally (bad settings, item
    /// list unresolvable, or persistence failure). The job row is marked
    /// `FAILED` before the error propagates.
    pub async fn run(&self, job_id: i64) -> anyhow::Result<()> {
        let Some(job) = get_job(&self.pool, job_id).await? else {
            tracing::warn!(job_id, "job not found, nothing to run");
            return Ok(());
        };

        if !claim_job(&self.pool, job.id).await? {
            tracing::debug!(job_id, "lost the claim race, skipping");
            return Ok(());
        }
        tracing::info!(job_id, job_type = %job.job_type, total_items = job.total_items, "job claimed");

        match self.process_job(&job).await {
            Ok(()) => {
                if let Err(err) = complete_job(&self.pool, job.id).await {
                    let message = format!("could not mark job complete: {err}");
                    self.fail_job_best_effort(job.id, &message).await;
                    return Err(err.into());
                }
                tracing::info!(job_id, "job completed");
                Ok(())
            }
            Err(err) => {
                let message = format!("{err:#}");
                tracing::error!(job_id, error = %message, "job failed");
                if let Err(fail_err) = fail_job(&self.pool, job.id, &message).await {
                    tracing::error!(job_id, error = %fail_err, "could not mark job failed");
                    self.fail_job_best_effort(job.id, &message).await;
                }
                Err(err)
            }
        }
    }

    async fn process_job(&self, job: &mscout_db::CollectionJobRow) -> anyhow::Result<()> {
        let settings: JobSettings = serde_json::from_value(job.settings.clone())
            .map_err(|e| anyhow::anyhow!("invalid job settings: {e}"))?;

        let job_type = JobType::parse(&job.job_type)
            .ok_or_else(|| anyhow::anyhow!("unknown job type '{}'", job.job_type))?;
        let asins = resolve_asins(job_type, &job.input_data)?;

        for (index, asin) in asins.iter().enumerate() {
            let result = match items::process_item(
                &self.pool,
                &self.scraper,
                &self.rates,
                &self.exchange,
                job.user_id,
                asin,
                &settings,
            )
            .await
            {
                Ok(()) => ItemResult::success(asin.clone()),
                Err(e) => {
                    tracing::warn!(job_id = job.id, asin = %asin, error = %e, "item failed");
                    ItemResult::error(asin.clone(), format!("{e:#}"))
                }
            };

            // Flushed per item so polling clients see live progress.
            record_item_result(&self.pool, job.id, &result).await?;

            // Deliberate pacing between source fetches.
            if index + 1 < asins.len() {
                tokio::time::sleep(self.inter_item_delay).await;
            }
        }

        Ok(())
    }

    /// Last-ditch failure path: used when the normal `fail_job` transition
    /// itself failed, so the job is not left `PROCESSING` forever.
    async fn fail_job_best_effort(&self, job_id: i64, message: &str) {
        match force_fail_job(&self.pool, job_id, message).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(job_id, "force-fail found the job already terminal");
            }
            Err(e) => {
                tracing::error!(job_id, error = %e, "force-fail also failed; stale sweep will catch it");
            }
        }
    }
}

fn asin_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:/dp/|/gp/product/)([A-Z0-9]{10})").expect("static ASIN pattern")
    })
}

/// Resolves the ASIN list a job will walk.
///
/// Single-ASIN jobs carry `asin`; URL jobs carry a product `url` the ASIN
/// is extracted from; keyword, category, and bulk jobs carry a
/// pre-resolved `asins` array.
fn resolve_asins(job_type: JobType, input_data: &serde_json::Value) -> anyhow::Result<Vec<String>> {
    match job_type {
        JobType::SingleAsin => {
            let asin = input_data
                .get("asin")
                .and_then(serde_json::Value::as_str)
                .ok_or_else(|| anyhow::anyhow!("single-ASIN job has no 'asin' field"))?;
            Ok(vec![asin.to_string()])
        }
        JobType::Url => {
            let url = input_data
                .get("url")
                .and_then(serde_json::Value::as_str)
                .ok_or_else(|| anyhow::anyhow!("URL job has no 'url' field"))?;
            let asin = asin_url_re()
                .captures(url)
                .and_then(|c| c.get(1))
                .ok_or_else(|| anyhow::anyhow!("no ASIN found in URL '{url}'"))?;
            Ok(vec![asin.as_str().to_string()])
        }
        JobType::Keyword | JobType::Category | JobType::Bulk => {
            let asins = input_data
                .get("asins")
                .and_then(serde_json::Value::as_array)
                .ok_or_else(|| anyhow::anyhow!("job has no 'asins' list"))?;
            asins
                .iter()
                .map(|v| {
                    v.as_str()
                        .map(ToString::to_string)
                        .ok_or_else(|| anyhow::anyhow!("non-string entry in 'asins' list"))
                })
                .collect()
        }
    }
}
