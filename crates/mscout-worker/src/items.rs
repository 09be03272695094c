//! Per-item pipeline: fetch, persist, and optionally analyze one listing.

use rust_decimal::Decimal;
use sqlx::PgPool;

use mscout_core::{Category, JobSettings, ShippingTier, Subcategory};
use mscout_db::{
    mark_item_analyzed, mark_item_collected, mark_item_error, upsert_item_collecting,
    AnalysisUpdate, CollectedProduct,
};
use mscout_pricing::{recommend_price, ExchangeRateCache, ProfitInput, RateStore};
use mscout_scraper::{ProductRecord, ScraperClient};

/// Margin at or above which an item is flagged profitable.
fn profitability_floor() -> Decimal {
    Decimal::new(10, 0)
}

/// Runs one item through collect and (optionally) analyze.
///
/// The item row tracks its own lifecycle: any failure lands it in `ERROR`
/// with a message before the error is returned to the job loop, which
/// records it and moves on.
///
/// # Errors
///
/// Returns an error when the fetch, persist, or analysis step failed. The
/// caller records it as the item's outcome; it is never fatal to the job.
pub(crate) async fn process_item(
    pool: &PgPool,
    scraper: &ScraperClient,
    rates: &RateStore,
    exchange: &ExchangeRateCache,
    user_id: i64,
    asin: &str,
    settings: &JobSettings,
) -> anyhow::Result<()> {
    let item = upsert_item_collecting(pool, user_id, asin).await?;

    let record = match scraper.fetch_product(asin).await {
        Ok(record) => record,
        Err(e) => {
            record_error(pool, item.id, &format!("fetch failed: {e}")).await;
            return Err(e.into());
        }
    };

    mark_item_collected(pool, item.id, &to_collected_product(&record)).await?;

    if !settings.auto_analyze {
        return Ok(());
    }

    match analyze(&record, rates, exchange, settings).await {
        Ok(update) => {
            mark_item_analyzed(pool, item.id, &update).await?;
            Ok(())
        }
        Err(e) => {
            record_error(pool, item.id, &format!("analysis failed: {e}")).await;
            Err(e)
        }
    }
}

async fn analyze(
    record: &ProductRecord,
    rates: &RateStore,
    exchange: &ExchangeRateCache,
    settings: &JobSettings,
) -> anyhow::Result<AnalysisUpdate> {
    let price_jpy = record
        .price_jpy
        .ok_or_else(|| anyhow::anyhow!("listing has no buyable price"))?;

    let category = record
        .category
        .as_deref()
        .map_or(Category::DailyNecessities, Category::parse_or_default);
    let subcategory = record.subcategory.as_deref().and_then(Subcategory::parse);

    let input = ProfitInput {
        price_jpy,
        weight_g: record.weight_g,
        tier: ShippingTier::Economy,
        category,
        subcategory,
        origin_shipping_jpy: Decimal::from(settings.origin_shipping_jpy),
        local_shipping_krw: Decimal::from(settings.local_shipping_krw),
        packaging_fee_krw: Decimal::ZERO,
        sell_price_krw: Decimal::ZERO,
    };

    let book = rates.snapshot();
    let rate = exchange.rate().await;
    let recommendation = recommend_price(&input, settings.target_margin, &book, rate)?;

    let profit_margin = recommendation.breakdown.margin_percent;
    Ok(AnalysisUpdate {
        profit_analysis: serde_json::to_value(&recommendation)?,
        recommended_price: Some(recommendation.recommended_price_krw),
        profit_margin,
        is_profitable: profit_margin >= profitability_floor(),
    })
}

fn to_collected_product(record: &ProductRecord) -> CollectedProduct {
    CollectedProduct {
        title: record.title.clone(),
        price_jpy: record.price_jpy,
        weight_g: i32::try_from(record.weight_g).unwrap_or(i32::MAX),
        category: record.category.clone(),
        subcategory: record.subcategory.clone(),
        images: serde_json::json!(record.images),
        description: record.description.clone().unwrap_or_default(),
        features: serde_json::json!(record.features),
        source_url: Some(format!("https://www.amazon.co.jp/dp/{}", record.asin)),
    }
}

/// Best-effort error stamp; the job's result entry is the durable record,
/// so a miss here is only logged.
async fn record_error(pool: &PgPool, item_id: i64, message: &str) {
    match mark_item_error(pool, item_id, message).await {
        Ok(true) => {}
        Ok(false) => tracing::warn!(item_id, "item was not in flight when recording its error"),
        Err(e) => tracing::error!(item_id, error = %e, "could not record item error"),
    }
}
