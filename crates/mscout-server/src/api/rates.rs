use std::collections::BTreeMap;

use axum::{extract::State, Extension, Json};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::middleware::RequestId;

use super::{map_pricing_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct ExchangeRateView {
    krw_per_jpy: Decimal,
}

#[derive(Debug, Serialize)]
pub(super) struct ShippingRatesView {
    exchange_rate_p_to_jpy: Decimal,
    tiers: BTreeMap<String, TierSummary>,
}

#[derive(Debug, Serialize)]
pub(super) struct TierSummary {
    base_rate: Decimal,
    increment_weight_kg: Decimal,
    increment_rate: Decimal,
    max_weight_kg: Decimal,
    table_entries: usize,
}

pub(super) async fn get_exchange_rate(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<ExchangeRateView>> {
    let krw_per_jpy = state.exchange.rate().await;

    Json(ApiResponse {
        data: ExchangeRateView { krw_per_jpy },
        meta: ResponseMeta::new(req_id.0),
    })
}

/// Drops the cached rate and fetches a fresh one; fails loudly when the
/// upstream is down instead of answering with the fallback.
pub(super) async fn refresh_exchange_rate(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<ExchangeRateView>>, ApiError> {
    let krw_per_jpy = state
        .exchange
        .refresh()
        .await
        .map_err(|e| map_pricing_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: ExchangeRateView { krw_per_jpy },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_shipping_rates(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<ShippingRatesView>> {
    let book = state.rates.snapshot();

    let tiers = book
        .tiers
        .iter()
        .map(|(name, schedule)| {
            (
                name.clone(),
                TierSummary {
                    base_rate: schedule.base_rate,
                    increment_weight_kg: schedule.increment_weight,
                    increment_rate: schedule.increment_rate,
                    max_weight_kg: schedule.max_weight,
                    table_entries: schedule.rates.len(),
                },
            )
        })
        .collect();

    Json(ApiResponse {
        data: ShippingRatesView {
            exchange_rate_p_to_jpy: book.exchange_rate_p_to_jpy,
            tiers,
        },
        meta: ResponseMeta::new(req_id.0),
    })
}
