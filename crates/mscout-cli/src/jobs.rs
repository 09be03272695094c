//! Job queue commands: submit a job and drain the queue once.
//!
//! `process-jobs` runs the same [`JobRunner`] the server's scheduler uses,
//! so a job behaves identically whichever side picks it up.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;

use mscout_core::{AppConfig, JobType};
use mscout_pricing::{ExchangeRateCache, ExchangeRateClient, RateStore};
use mscout_scraper::ScraperClient;
use mscout_worker::JobRunner;

#[derive(Debug, Args)]
pub struct SubmitArgs {
    /// Owner of the job and its collected items
    #[arg(long)]
    pub user: i64,

    /// Job type: SINGLE_ASIN, URL, KEYWORD, CATEGORY, or BULK
    #[arg(long = "job-type", default_value = "BULK")]
    pub job_type: String,

    /// ASIN to collect; repeat for bulk jobs
    #[arg(long = "asin")]
    pub asins: Vec<String>,

    /// Product page URL (URL jobs only)
    #[arg(long)]
    pub url: Option<String>,

    /// Target margin percent for the price recommendation
    #[arg(long)]
    pub target_margin: Option<u32>,

    /// Collect only; skip the profit analysis
    #[arg(long)]
    pub no_auto_analyze: bool,
}

#[derive(Debug, Args)]
pub struct ProcessArgs {
    /// Maximum number of pending jobs to run
    #[arg(long, default_value_t = 10)]
    pub limit: i64,

    /// Per-job timeout in seconds
    #[arg(long = "timeout-secs", default_value_t = 600)]
    pub timeout_secs: u64,
}

/// Builds the job's `input_data` payload and item count from the CLI args.
fn build_job_payload(
    job_type: JobType,
    asins: &[String],
    url: Option<&str>,
) -> anyhow::Result<(serde_json::Value, i32)> {
    match job_type {
        JobType::SingleAsin => {
            let [asin] = asins else {
                anyhow::bail!("SINGLE_ASIN jobs take exactly one --asin");
            };
            Ok((serde_json::json!({ "asin": asin }), 1))
        }
        JobType::Url => {
            let url = url.ok_or_else(|| anyhow::anyhow!("URL jobs require --url"))?;
            Ok((serde_json::json!({ "url": url }), 1))
        }
        JobType::Keyword | JobType::Category | JobType::Bulk => {
            if asins.is_empty() {
                anyhow::bail!("{} jobs require at least one --asin", job_type.as_str());
            }
            let total = i32::try_from(asins.len())?;
            Ok((serde_json::json!({ "asins": asins }), total))
        }
    }
}

fn build_settings(args: &SubmitArgs) -> serde_json::Value {
    let mut settings = serde_json::Map::new();
    if let Some(target) = args.target_margin {
        settings.insert("target_margin".to_string(), target.into());
    }
    if args.no_auto_analyze {
        settings.insert("auto_analyze".to_string(), false.into());
    }
    serde_json::Value::Object(settings)
}

/// # Errors
///
/// Returns an error when the job type or input args are invalid, or the
/// insert fails.
pub async fn submit(config: &AppConfig, args: SubmitArgs) -> anyhow::Result<()> {
    let job_type = JobType::parse(&args.job_type)
        .ok_or_else(|| anyhow::anyhow!("unknown job type '{}'", args.job_type))?;
    let (input_data, total_items) = build_job_payload(job_type, &args.asins, args.url.as_deref())?;
    let settings = build_settings(&args);

    let pool = crate::connect(config).await?;
    let job = mscout_db::create_job(
        &pool,
        mscout_db::NewJob {
            user_id: args.user,
            job_type,
            input_data,
            settings,
            total_items,
        },
    )
    .await?;

    println!(
        "queued {} job {} ({} item{})",
        job.job_type,
        job.public_id,
        job.total_items,
        if job.total_items == 1 { "" } else { "s" }
    );
    Ok(())
}

/// # Errors
///
/// Returns an error when the pool or runner cannot be constructed or the
/// pending list cannot be loaded; per-job failures are reported and
/// counted, not propagated.
pub async fn process_jobs(config: &AppConfig, args: ProcessArgs) -> anyhow::Result<()> {
    let pool = crate::connect(config).await?;
    let runner = build_runner(config, pool.clone())?;

    let pending = mscout_db::list_pending_jobs(&pool, args.limit).await?;
    if pending.is_empty() {
        println!("no pending jobs");
        return Ok(());
    }

    let timeout = Duration::from_secs(args.timeout_secs);
    let (mut done, mut failed) = (0u32, 0u32);
    for job in pending {
        match tokio::time::timeout(timeout, runner.run(job.id)).await {
            Ok(Ok(())) => done += 1,
            Ok(Err(e)) => {
                failed += 1;
                tracing::error!(job_id = %job.public_id, error = %e, "job failed");
            }
            Err(_) => {
                failed += 1;
                tracing::error!(job_id = %job.public_id, "job timed out");
            }
        }
    }

    println!("processed {done} job(s), {failed} failure(s)");
    Ok(())
}

fn build_runner(config: &AppConfig, pool: sqlx::PgPool) -> anyhow::Result<JobRunner> {
    let scraper = ScraperClient::new(
        config.scraper_base_url.clone(),
        config.scraper_timeout_secs,
        &config.scraper_user_agent,
    )?;
    let rates = RateStore::open(config.rates_path.clone())?;
    let exchange_client =
        ExchangeRateClient::new(config.exchange_api_url.clone(), config.exchange_timeout_secs)?;
    let exchange = ExchangeRateCache::new(
        exchange_client,
        Duration::from_secs(config.exchange_cache_ttl_secs),
    );

    Ok(JobRunner::new(
        pool,
        Arc::new(scraper),
        Arc::new(rates),
        Arc::new(exchange),
        Duration::from_millis(config.worker_inter_item_delay_ms),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asins(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn single_asin_takes_exactly_one() {
        let (input, total) =
            build_job_payload(JobType::SingleAsin, &asins(&["B000TEST01"]), None).unwrap();
        assert_eq!(input["asin"], "B000TEST01");
        assert_eq!(total, 1);

        assert!(build_job_payload(JobType::SingleAsin, &[], None).is_err());
        assert!(build_job_payload(JobType::SingleAsin, &asins(&["a", "b"]), None).is_err());
    }

    #[test]
    fn url_jobs_require_the_url() {
        let (input, total) =
            build_job_payload(JobType::Url, &[], Some("https://www.amazon.co.jp/dp/B000TEST01"))
                .unwrap();
        assert_eq!(total, 1);
        assert!(input["url"].as_str().unwrap().contains("/dp/"));

        assert!(build_job_payload(JobType::Url, &[], None).is_err());
    }

    #[test]
    fn bulk_jobs_carry_the_asin_list() {
        let (input, total) =
            build_job_payload(JobType::Bulk, &asins(&["a", "b", "c"]), None).unwrap();
        assert_eq!(total, 3);
        assert_eq!(input["asins"].as_array().unwrap().len(), 3);

        assert!(build_job_payload(JobType::Bulk, &[], None).is_err());
    }

    #[test]
    fn settings_only_carry_explicit_overrides() {
        let args = SubmitArgs {
            user: 1,
            job_type: "BULK".to_string(),
            asins: vec![],
            url: None,
            target_margin: None,
            no_auto_analyze: false,
        };
        assert_eq!(build_settings(&args), serde_json::json!({}));

        let args = SubmitArgs {
            target_margin: Some(15),
            no_auto_analyze: true,
            ..args
        };
        assert_eq!(
            build_settings(&args),
            serde_json::json!({ "target_margin": 15, "auto_analyze": false })
        );
    }
}
