mod jobs;
mod maintenance;
mod rates;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "mscout-cli")]
#[command(about = "Margin Scout operations CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Queue a collection job
    Submit(jobs::SubmitArgs),
    /// Claim and run pending jobs once, oldest first
    ProcessJobs(jobs::ProcessArgs),
    /// Fail jobs stuck in PROCESSING (and optionally expired PENDING jobs)
    CleanupStuck(maintenance::CleanupArgs),
    /// Install a shipping rate table, or regenerate the formula defaults
    UpdateRates(rates::UpdateRatesArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = mscout_core::load_app_config()?;

    match cli.command {
        Commands::Submit(args) => jobs::submit(&config, args).await,
        Commands::ProcessJobs(args) => jobs::process_jobs(&config, args).await,
        Commands::CleanupStuck(args) => maintenance::cleanup_stuck(&config, args).await,
        Commands::UpdateRates(args) => rates::update_rates(&config, &args),
    }
}

pub(crate) async fn connect(config: &mscout_core::AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = mscout_db::PoolConfig::from_app_config(config);
    let pool = mscout_db::connect_pool(&config.database_url, pool_config).await?;
    mscout_db::run_migrations(&pool).await?;
    Ok(pool)
}
