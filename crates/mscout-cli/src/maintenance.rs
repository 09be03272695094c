//! Queue hygiene for operators, mirroring the server's scheduled sweeps.

use clap::Args;

use mscout_core::AppConfig;

#[derive(Debug, Args)]
pub struct CleanupArgs {
    /// Fail PROCESSING jobs with no progress for this many minutes
    #[arg(long = "timeout-mins", default_value_t = 30)]
    pub timeout_mins: i64,

    /// Also fail PENDING jobs older than the timeout
    #[arg(long)]
    pub include_pending: bool,
}

/// # Errors
///
/// Returns an error when the pool cannot be built or a sweep query fails.
pub async fn cleanup_stuck(config: &AppConfig, args: CleanupArgs) -> anyhow::Result<()> {
    let pool = crate::connect(config).await?;

    let stale = mscout_db::sweep_stale_processing(&pool, args.timeout_mins).await?;
    println!("failed {stale} stuck processing job(s)");

    if args.include_pending {
        let expired = mscout_db::fail_stale_pending(&pool, args.timeout_mins).await?;
        println!("failed {expired} expired pending job(s)");
    }

    Ok(())
}
