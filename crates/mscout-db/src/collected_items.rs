//! Database operations for `collected_items`.
//!
//! Items are owner-scoped: `(user_id, asin)` is unique and re-collection
//! updates the existing row in place, so a user never accumulates
//! duplicates of one listing.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `collected_items` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CollectedItemRow {
    pub id: i64,
    pub user_id: i64,
    pub asin: String,
    pub title: String,
    pub price_jpy: Option<Decimal>,
    pub weight_g: Option<i32>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub images: serde_json::Value,
    pub description: String,
    pub features: serde_json::Value,
    pub source_url: Option<String>,
    pub status: String,
    pub profit_analysis: Option<serde_json::Value>,
    pub recommended_price: Option<Decimal>,
    pub profit_margin: Option<Decimal>,
    pub is_profitable: Option<bool>,
    pub collected_at: Option<DateTime<Utc>>,
    pub analyzed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Product fields written when a fetch succeeds.
#[derive(Debug, Clone)]
pub struct CollectedProduct {
    pub title: String,
    pub price_jpy: Option<Decimal>,
    pub weight_g: i32,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub images: serde_json::Value,
    pub description: String,
    pub features: serde_json::Value,
    pub source_url: Option<String>,
}

/// Analysis fields written when the profit calculation succeeds.
#[derive(Debug, Clone)]
pub struct AnalysisUpdate {
    pub profit_analysis: serde_json::Value,
    pub recommended_price: Option<Decimal>,
    pub profit_margin: Decimal,
    pub is_profitable: bool,
}

const ITEM_COLUMNS: &str = "id, user_id, asin, title, price_jpy, weight_g, category, subcategory, \
     images, description, features, source_url, status, profit_analysis, recommended_price, \
     profit_margin, is_profitable, collected_at, analyzed_at, error_message, created_at, \
     updated_at";

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Creates or resets the owner's row for an ASIN in `COLLECTING` status.
/// A re-collection reuses the existing row and clears any previous error.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_item_collecting(
    pool: &PgPool,
    user_id: i64,
    asin: &str,
) -> Result<CollectedItemRow, DbError> {
    let row = sqlx::query_as::<_, CollectedItemRow>(&format!(
        "INSERT INTO collected_items (user_id, asin, status) \
         VALUES ($1, $2, 'COLLECTING') \
         ON CONFLICT (user_id, asin) DO UPDATE \
             SET status = 'COLLECTING', error_message = NULL, updated_at = NOW() \
         RETURNING {ITEM_COLUMNS}"
    ))
    .bind(user_id)
    .bind(asin)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Writes the fetched product fields and moves the item to `COLLECTED`.
///
/// # Errors
///
/// - [`DbError::InvalidItemTransition`] if the item is not `COLLECTING`.
/// - [`DbError::Sqlx`] if the update fails.
pub async fn mark_item_collected(
    pool: &PgPool,
    id: i64,
    product: &CollectedProduct,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE collected_items \
         SET title = $1, price_jpy = $2, weight_g = $3, category = $4, subcategory = $5, \
             images = $6, description = $7, features = $8, source_url = $9, \
             status = 'COLLECTED', collected_at = NOW(), updated_at = NOW() \
         WHERE id = $10 AND status = 'COLLECTING'",
    )
    .bind(&product.title)
    .bind(product.price_jpy)
    .bind(product.weight_g)
    .bind(&product.category)
    .bind(&product.subcategory)
    .bind(&product.images)
    .bind(&product.description)
    .bind(&product.features)
    .bind(&product.source_url)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidItemTransition {
            id,
            expected_status: "COLLECTING",
        });
    }

    Ok(())
}

/// Writes the profit analysis and moves the item to `ANALYZED`.
///
/// # Errors
///
/// - [`DbError::InvalidItemTransition`] if the item is not `COLLECTED`.
/// - [`DbError::Sqlx`] if the update fails.
pub async fn mark_item_analyzed(
    pool: &PgPool,
    id: i64,
    analysis: &AnalysisUpdate,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE collected_items \
         SET profit_analysis = $1, recommended_price = $2, profit_margin = $3, \
             is_profitable = $4, status = 'ANALYZED', analyzed_at = NOW(), updated_at = NOW() \
         WHERE id = $5 AND status = 'COLLECTED'",
    )
    .bind(&analysis.profit_analysis)
    .bind(analysis.recommended_price)
    .bind(analysis.profit_margin)
    .bind(analysis.is_profitable)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidItemTransition {
            id,
            expected_status: "COLLECTED",
        });
    }

    Ok(())
}

/// Moves an in-flight item to `ERROR` with a message. Applies from either
/// `COLLECTING` (fetch failed) or `COLLECTED` (analysis failed); returns
/// whether a row changed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn mark_item_error(
    pool: &PgPool,
    id: i64,
    error_message: &str,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE collected_items \
         SET status = 'ERROR', error_message = $1, updated_at = NOW() \
         WHERE id = $2 AND status IN ('COLLECTING', 'COLLECTED')",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// Lists a user's items, newest first, optionally filtered by status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_items_for_user(
    pool: &PgPool,
    user_id: i64,
    status: Option<&str>,
    limit: i64,
) -> Result<Vec<CollectedItemRow>, DbError> {
    let rows = sqlx::query_as::<_, CollectedItemRow>(&format!(
        "SELECT {ITEM_COLUMNS} FROM collected_items \
         WHERE user_id = $1 AND ($2::TEXT IS NULL OR status = $2) \
         ORDER BY updated_at DESC LIMIT $3"
    ))
    .bind(user_id)
    .bind(status)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_item_by_asin(
    pool: &PgPool,
    user_id: i64,
    asin: &str,
) -> Result<Option<CollectedItemRow>, DbError> {
    let row = sqlx::query_as::<_, CollectedItemRow>(&format!(
        "SELECT {ITEM_COLUMNS} FROM collected_items WHERE user_id = $1 AND asin = $2"
    ))
    .bind(user_id)
    .bind(asin)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_items_for_user(pool: &PgPool, user_id: i64) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM collected_items WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
