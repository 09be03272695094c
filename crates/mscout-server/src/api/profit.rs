use axum::{extract::State, Extension, Json};
use rust_decimal::Decimal;
use serde::Deserialize;

use mscout_core::{Category, ShippingTier, Subcategory};
use mscout_pricing::{ProfitBreakdown, ProfitInput, Recommendation};

use crate::middleware::RequestId;

use super::{map_pricing_error, ApiError, ApiResponse, AppState, ResponseMeta};

fn default_weight_g() -> u32 {
    500
}

fn default_tier() -> String {
    ShippingTier::Economy.as_str().to_string()
}

fn default_target_margin() -> u32 {
    10
}

/// Shared listing fields of both profit endpoints.
#[derive(Debug, Deserialize)]
pub(super) struct ListingParams {
    pub price_jpy: Decimal,
    #[serde(default = "default_weight_g")]
    pub weight_g: u32,
    #[serde(default = "default_tier")]
    pub tier: String,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    #[serde(default)]
    pub origin_shipping_jpy: Decimal,
    #[serde(default)]
    pub local_shipping_krw: Decimal,
    #[serde(default)]
    pub packaging_fee_krw: Decimal,
}

#[derive(Debug, Deserialize)]
pub(super) struct CalculateRequest {
    #[serde(flatten)]
    pub listing: ListingParams,
    #[serde(default)]
    pub sell_price_krw: Decimal,
}

#[derive(Debug, Deserialize)]
pub(super) struct RecommendRequest {
    #[serde(flatten)]
    pub listing: ListingParams,
    #[serde(default = "default_target_margin")]
    pub target_margin: u32,
}

fn to_profit_input(
    req_id: &str,
    listing: &ListingParams,
    sell_price_krw: Decimal,
) -> Result<ProfitInput, ApiError> {
    let tier = ShippingTier::parse(&listing.tier).ok_or_else(|| {
        ApiError::new(
            req_id,
            "validation_error",
            format!("unknown shipping tier '{}'", listing.tier),
        )
    })?;

    Ok(ProfitInput {
        price_jpy: listing.price_jpy,
        weight_g: listing.weight_g,
        tier,
        category: listing
            .category
            .as_deref()
            .map_or(Category::DailyNecessities, Category::parse_or_default),
        subcategory: listing.subcategory.as_deref().and_then(Subcategory::parse),
        origin_shipping_jpy: listing.origin_shipping_jpy,
        local_shipping_krw: listing.local_shipping_krw,
        packaging_fee_krw: listing.packaging_fee_krw,
        sell_price_krw,
    })
}

pub(super) async fn calculate(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CalculateRequest>,
) -> Result<Json<ApiResponse<ProfitBreakdown>>, ApiError> {
    let input = to_profit_input(&req_id.0, &body.listing, body.sell_price_krw)?;
    let book = state.rates.snapshot();
    let rate = state.exchange.rate().await;

    let breakdown = mscout_pricing::calculate(&input, &book, rate)
        .map_err(|e| map_pricing_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: breakdown,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn recommend(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<RecommendRequest>,
) -> Result<Json<ApiResponse<Recommendation>>, ApiError> {
    let input = to_profit_input(&req_id.0, &body.listing, Decimal::ZERO)?;
    let book = state.rates.snapshot();
    let rate = state.exchange.rate().await;

    let recommendation = mscout_pricing::recommend_price(&input, body.target_margin, &book, rate)
        .map_err(|e| map_pricing_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: recommendation,
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calculate_request_fills_defaults() {
        let body: CalculateRequest =
            serde_json::from_value(serde_json::json!({ "price_jpy": "2480" })).unwrap();
        assert_eq!(body.listing.weight_g, 500);
        assert_eq!(body.listing.tier, "economy");
        assert_eq!(body.sell_price_krw, Decimal::ZERO);

        let input = to_profit_input("req-1", &body.listing, body.sell_price_krw).unwrap();
        assert_eq!(input.tier, ShippingTier::Economy);
        assert_eq!(input.category, Category::DailyNecessities);
        assert!(input.subcategory.is_none());
    }

    #[test]
    fn recommend_request_defaults_the_target_margin() {
        let body: RecommendRequest = serde_json::from_value(serde_json::json!({
            "price_jpy": "2480",
            "category": "electronics",
            "subcategory": "monitors"
        }))
        .unwrap();
        assert_eq!(body.target_margin, 10);

        let input = to_profit_input("req-1", &body.listing, Decimal::ZERO).unwrap();
        assert_eq!(input.category, Category::Electronics);
        assert_eq!(input.subcategory, Some(Subcategory::Monitors));
    }

    #[test]
    fn unknown_tier_is_a_validation_error() {
        let body: CalculateRequest = serde_json::from_value(serde_json::json!({
            "price_jpy": "100",
            "tier": "overnight"
        }))
        .unwrap();
        let err = to_profit_input("req-1", &body.listing, Decimal::ZERO)
            .expect_err("tier is not supported");
        assert_eq!(err.error.code, "validation_error");
    }

    #[test]
    fn unknown_category_falls_back_instead_of_erroring() {
        let body: CalculateRequest = serde_json::from_value(serde_json::json!({
            "price_jpy": "100",
            "category": "gardening",
            "subcategory": "lawnmowers"
        }))
        .unwrap();
        let input = to_profit_input("req-1", &body.listing, Decimal::ZERO).unwrap();
        assert_eq!(input.category, Category::DailyNecessities);
        assert!(input.subcategory.is_none());
    }
}
