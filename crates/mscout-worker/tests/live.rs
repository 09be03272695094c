//! Live worker tests: a real (sqlx-test) database plus a wiremock collector.
//!
//! The exchange endpoint is deliberately left unmocked; the cache falls
//! back to its fixed rate, which keeps analyses deterministic.

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mscout_core::JobType;
use mscout_db::{claim_job, create_job, get_item_by_asin, get_job, NewJob};
use mscout_pricing::{ExchangeRateCache, ExchangeRateClient, RateStore};
use mscout_scraper::ScraperClient;
use mscout_worker::JobRunner;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn runner_for(pool: &sqlx::PgPool, server: &MockServer) -> JobRunner {
    let scraper = ScraperClient::new(format!("{}/api/v1", server.uri()), 5, "test-agent")
        .expect("scraper client");
    let exchange_client = ExchangeRateClient::new(format!("{}/unmocked-rates", server.uri()), 5)
        .expect("exchange client");
    let exchange = ExchangeRateCache::new(exchange_client, Duration::from_secs(3600));
    let rates = RateStore::open(std::env::temp_dir().join("mscout-worker-test-rates.json"))
        .expect("rate store");

    JobRunner::new(
        pool.clone(),
        Arc::new(scraper),
        Arc::new(rates),
        Arc::new(exchange),
        Duration::ZERO,
    )
}

async fn mock_product(server: &MockServer, asin: &str, price: &str) {
    Mock::given(method("GET"))
        .and(path("/api/v1/scrape/amazon"))
        .and(query_param("asin", asin))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": true,
            "data": {
                "title": format!("Product {asin}"),
                "price": price,
                "weight": "600 g",
                "category": "electronics",
                "images": [],
                "features": []
            }
        })))
        .mount(server)
        .await;
}

async fn mock_failure(server: &MockServer, asin: &str, message: &str) {
    Mock::given(method("GET"))
        .and(path("/api/v1/scrape/amazon"))
        .and(query_param("asin", asin))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": false,
            "message": message
        })))
        .mount(server)
        .await;
}

fn bulk_job(user_id: i64, asins: &[&str], settings: serde_json::Value) -> NewJob {
    NewJob {
        user_id,
        job_type: JobType::Bulk,
        input_data: serde_json::json!({ "asins": asins }),
        settings,
        total_items: i32::try_from(asins.len()).unwrap(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn bulk_job_collects_and_analyzes_every_item(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    mock_product(&server, "B000TEST01", "¥2,480").await;
    mock_product(&server, "B000TEST02", "¥12,800").await;

    let job = create_job(
        &pool,
        bulk_job(1, &["B000TEST01", "B000TEST02"], serde_json::json!({})),
    )
    .await
    .unwrap();

    runner_for(&pool, &server).run(job.id).await.unwrap();

    let done = get_job(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(done.status, "COMPLETED");
    assert_eq!(done.progress, 2);
    assert_eq!(done.success_count, 2);
    assert_eq!(done.error_count, 0);
    assert_eq!(done.results.as_array().unwrap().len(), 2);

    for asin in ["B000TEST01", "B000TEST02"] {
        let item = get_item_by_asin(&pool, 1, asin).await.unwrap().unwrap();
        assert_eq!(item.status, "ANALYZED", "item {asin}");
        assert!(item.recommended_price.is_some());
        assert!(item.profit_margin.is_some());
        assert!(item.profit_analysis.is_some());
        assert_eq!(item.weight_g, Some(600));
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn one_bad_item_does_not_abort_the_job(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    mock_product(&server, "B000GOOD001", "¥2,480").await;
    mock_failure(&server, "B000GONE001", "listing no longer exists").await;

    let job = create_job(
        &pool,
        bulk_job(1, &["B000GONE001", "B000GOOD001"], serde_json::json!({})),
    )
    .await
    .unwrap();

    runner_for(&pool, &server).run(job.id).await.unwrap();

    let done = get_job(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(done.status, "COMPLETED");
    assert_eq!(done.success_count, 1);
    assert_eq!(done.error_count, 1);

    let failed = get_item_by_asin(&pool, 1, "B000GONE001")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(failed.status, "ERROR");
    assert!(failed
        .error_message
        .as_deref()
        .unwrap()
        .contains("listing no longer exists"));

    let good = get_item_by_asin(&pool, 1, "B000GOOD001")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(good.status, "ANALYZED");
}

#[sqlx::test(migrations = "../../migrations")]
async fn auto_analyze_off_stops_at_collected(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    mock_product(&server, "B000TEST01", "¥2,480").await;

    let job = create_job(
        &pool,
        bulk_job(
            1,
            &["B000TEST01"],
            serde_json::json!({ "auto_analyze": false }),
        ),
    )
    .await
    .unwrap();

    runner_for(&pool, &server).run(job.id).await.unwrap();

    let item = get_item_by_asin(&pool, 1, "B000TEST01")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(item.status, "COLLECTED");
    assert!(item.recommended_price.is_none());
    assert!(item.analyzed_at.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn unpriced_listing_is_an_analysis_error(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    mock_product(&server, "B000NOPRICE", "currently unavailable").await;

    let job = create_job(&pool, bulk_job(1, &["B000NOPRICE"], serde_json::json!({})))
        .await
        .unwrap();

    runner_for(&pool, &server).run(job.id).await.unwrap();

    let done = get_job(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(done.status, "COMPLETED");
    assert_eq!(done.error_count, 1);

    let item = get_item_by_asin(&pool, 1, "B000NOPRICE")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(item.status, "ERROR");
    assert!(item.error_message.as_deref().unwrap().contains("no buyable price"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn zero_item_job_completes_immediately(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    let job = create_job(&pool, bulk_job(1, &[], serde_json::json!({})))
        .await
        .unwrap();

    runner_for(&pool, &server).run(job.id).await.unwrap();

    let done = get_job(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(done.status, "COMPLETED");
    assert_eq!(done.progress, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn missing_job_and_lost_race_are_quiet_no_ops(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    let runner = runner_for(&pool, &server);

    // Nonexistent job id.
    runner.run(424_242).await.unwrap();

    // Someone else already claimed this one.
    let job = create_job(&pool, bulk_job(1, &["B000TEST01"], serde_json::json!({})))
        .await
        .unwrap();
    assert!(claim_job(&pool, job.id).await.unwrap());
    runner.run(job.id).await.unwrap();

    let row = get_job(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(row.status, "PROCESSING");
    assert_eq!(row.progress, 0, "the losing runner touched nothing");
}

#[sqlx::test(migrations = "../../migrations")]
async fn unresolvable_input_fails_the_job(pool: sqlx::PgPool) {
    let server = MockServer::start().await;

    let job = create_job(
        &pool,
        NewJob {
            user_id: 1,
            job_type: JobType::Bulk,
            input_data: serde_json::json!({ "nothing": true }),
            settings: serde_json::json!({}),
            total_items: 0,
        },
    )
    .await
    .unwrap();

    let err = runner_for(&pool, &server).run(job.id).await;
    assert!(err.is_err());

    let row = get_job(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(row.status, "FAILED");
    assert!(row.error_message.as_deref().unwrap().contains("asins"));
}
