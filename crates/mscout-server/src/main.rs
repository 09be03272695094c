mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use mscout_pricing::{ExchangeRateCache, ExchangeRateClient, RateStore};
use mscout_scraper::ScraperClient;
use mscout_worker::JobRunner;

use crate::api::{build_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(mscout_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = mscout_db::PoolConfig::from_app_config(&config);
    let pool = mscout_db::connect_pool(&config.database_url, pool_config).await?;
    mscout_db::run_migrations(&pool).await?;

    let scraper = Arc::new(ScraperClient::new(
        config.scraper_base_url.clone(),
        config.scraper_timeout_secs,
        &config.scraper_user_agent,
    )?);
    let rates = Arc::new(RateStore::open(config.rates_path.clone())?);
    let exchange_client =
        ExchangeRateClient::new(config.exchange_api_url.clone(), config.exchange_timeout_secs)?;
    let exchange = Arc::new(ExchangeRateCache::new(
        exchange_client,
        Duration::from_secs(config.exchange_cache_ttl_secs),
    ));

    let runner = JobRunner::new(
        pool.clone(),
        Arc::clone(&scraper),
        Arc::clone(&rates),
        Arc::clone(&exchange),
        Duration::from_millis(config.worker_inter_item_delay_ms),
    );

    let _scheduler = scheduler::build_scheduler(
        pool.clone(),
        Arc::clone(&config),
        runner,
        Arc::clone(&rates),
        Arc::clone(&exchange),
    )
    .await?;

    let app = build_app(AppState {
        pool,
        rates,
        exchange,
    });

    tracing::info!(addr = %config.bind_addr, "listening");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
