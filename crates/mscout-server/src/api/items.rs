use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use mscout_core::ItemStatus;
use mscout_db::CollectedItemRow;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct ItemsQuery {
    pub user_id: i64,
    pub status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct ItemView {
    asin: String,
    title: String,
    price_jpy: Option<Decimal>,
    weight_g: Option<i32>,
    category: Option<String>,
    subcategory: Option<String>,
    images: serde_json::Value,
    description: String,
    features: serde_json::Value,
    source_url: Option<String>,
    status: String,
    profit_analysis: Option<serde_json::Value>,
    recommended_price: Option<Decimal>,
    profit_margin: Option<Decimal>,
    is_profitable: Option<bool>,
    collected_at: Option<DateTime<Utc>>,
    analyzed_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
    updated_at: DateTime<Utc>,
}

impl From<CollectedItemRow> for ItemView {
    fn from(row: CollectedItemRow) -> Self {
        Self {
            asin: row.asin,
            title: row.title,
            price_jpy: row.price_jpy,
            weight_g: row.weight_g,
            category: row.category,
            subcategory: row.subcategory,
            images: row.images,
            description: row.description,
            features: row.features,
            source_url: row.source_url,
            status: row.status,
            profit_analysis: row.profit_analysis,
            recommended_price: row.recommended_price,
            profit_margin: row.profit_margin,
            is_profitable: row.is_profitable,
            collected_at: row.collected_at,
            analyzed_at: row.analyzed_at,
            error_message: row.error_message,
            updated_at: row.updated_at,
        }
    }
}

pub(super) async fn list_items(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ItemsQuery>,
) -> Result<Json<ApiResponse<Vec<ItemView>>>, ApiError> {
    // An unknown status filter would silently match nothing; reject it.
    let status = match query.status.as_deref() {
        None => None,
        Some(s) => Some(
            ItemStatus::parse(s)
                .ok_or_else(|| {
                    ApiError::new(
                        req_id.0.clone(),
                        "validation_error",
                        format!("unknown item status '{s}'"),
                    )
                })?
                .as_str(),
        ),
    };

    let rows = mscout_db::list_items_for_user(
        &state.pool,
        query.user_id,
        status,
        normalize_limit(query.limit),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(ItemView::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}
