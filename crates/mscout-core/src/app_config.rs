use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub rates_path: PathBuf,
    pub scraper_base_url: String,
    pub scraper_timeout_secs: u64,
    pub scraper_user_agent: String,
    pub exchange_api_url: String,
    pub exchange_timeout_secs: u64,
    pub exchange_cache_ttl_secs: u64,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub worker_inter_item_delay_ms: u64,
    pub worker_job_timeout_secs: u64,
    pub queue_drain_limit: i64,
    pub job_stale_after_mins: i64,
    pub pending_retention_mins: i64,
    pub failed_retention_hours: i64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("rates_path", &self.rates_path)
            .field("database_url", &"[redacted]")
            .field("scraper_base_url", &self.scraper_base_url)
            .field("scraper_timeout_secs", &self.scraper_timeout_secs)
            .field("scraper_user_agent", &self.scraper_user_agent)
            .field("exchange_api_url", &self.exchange_api_url)
            .field("exchange_timeout_secs", &self.exchange_timeout_secs)
            .field("exchange_cache_ttl_secs", &self.exchange_cache_ttl_secs)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "worker_inter_item_delay_ms",
                &self.worker_inter_item_delay_ms,
            )
            .field("worker_job_timeout_secs", &self.worker_job_timeout_secs)
            .field("queue_drain_limit", &self.queue_drain_limit)
            .field("job_stale_after_mins", &self.job_stale_after_mins)
            .field("pending_retention_mins", &self.pending_retention_mins)
            .field("failed_retention_hours", &self.failed_retention_hours)
            .finish()
    }
}
