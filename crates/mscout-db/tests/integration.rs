//! Offline unit tests for mscout-db pool configuration and row types.
//! These tests do not require a live database connection.

use mscout_core::{AppConfig, Environment};
use mscout_db::{CollectionJobRow, PoolConfig};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        rates_path: PathBuf::from("./config/shipping_rates.json"),
        scraper_base_url: "http://localhost:8001/api/v1".to_string(),
        scraper_timeout_secs: 60,
        scraper_user_agent: "ua".to_string(),
        exchange_api_url: "https://api.example/v4/latest/JPY".to_string(),
        exchange_timeout_secs: 10,
        exchange_cache_ttl_secs: 3600,
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        worker_inter_item_delay_ms: 2000,
        worker_job_timeout_secs: 1800,
        queue_drain_limit: 10,
        job_stale_after_mins: 30,
        pending_retention_mins: 30,
        failed_retention_hours: 168,
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

/// Compile-time smoke test: confirm that [`CollectionJobRow`] has all
/// expected fields with the correct types. No database required.
#[test]
fn collection_job_row_has_expected_fields() {
    use chrono::Utc;
    use uuid::Uuid;

    let row = CollectionJobRow {
        id: 1_i64,
        public_id: Uuid::new_v4(),
        user_id: 7_i64,
        job_type: "BULK".to_string(),
        input_data: serde_json::json!({ "asins": ["B000TEST01"] }),
        settings: serde_json::json!({}),
        status: "PENDING".to_string(),
        progress: 0_i32,
        total_items: 1_i32,
        success_count: 0_i32,
        error_count: 0_i32,
        results: serde_json::json!([]),
        error_message: None,
        started_at: None,
        completed_at: None,
        duration_seconds: None,
        created_at: Utc::now(),
    };

    assert_eq!(row.job_type, "BULK");
    assert_eq!(row.status, "PENDING");
    assert_eq!(row.progress, row.success_count + row.error_count);
    assert!(row.started_at.is_none());
    assert!(row.duration_seconds.is_none());
}
