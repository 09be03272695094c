mod items;
mod jobs;
mod profit;
mod rates;


use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use mscout_pricing::{ExchangeRateCache, PricingError, RateStore};

use crate::middleware::{request_id, RequestId};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub rates: Arc<RateStore>,
    pub exchange: Arc<ExchangeRateCache>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(super) fn map_db_error(request_id: String, error: &mscout_db::DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

/// Maps pricing failures: domain errors become 400s the caller can act on,
/// everything else is internal.
pub(super) fn map_pricing_error(request_id: String, error: &PricingError) -> ApiError {
    match error {
        PricingError::UnknownTier { .. }
        | PricingError::Overweight { .. }
        | PricingError::MarginTooHigh { .. } => {
            ApiError::new(request_id, "validation_error", error.to_string())
        }
        PricingError::ExchangeUnavailable { .. } | PricingError::Http(_) => {
            ApiError::new(request_id, "unavailable", error.to_string())
        }
        PricingError::RateBookIo { .. } | PricingError::RateBookParse { .. } => {
            tracing::error!(error = %error, "rate book failure");
            ApiError::new(request_id, "internal_error", "rate book unavailable")
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-request-id"),
        ])
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/api/jobs", get(jobs::list_jobs).post(jobs::create_job))
        .route("/api/jobs/{public_id}", get(jobs::get_job))
        .route("/api/jobs/{public_id}/cancel", post(jobs::cancel_job))
        .route("/api/items", get(items::list_items))
        .route("/api/profit/calculate", post(profit::calculate))
        .route("/api/profit/recommend", post(profit::recommend))
        .route("/api/rates/exchange", get(rates::get_exchange_rate))
        .route(
            "/api/rates/exchange/refresh",
            post(rates::refresh_exchange_rate),
        )
        .route("/api/rates/shipping", get(rates::get_shipping_rates))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match mscout_db::ping(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn normalize_limit_applies_defaults_and_bounds() {
        assert_eq!(normalize_limit(None), 50);
        assert_eq!(normalize_limit(Some(0)), 1);
        assert_eq!(normalize_limit(Some(1_000)), 200);
        assert_eq!(normalize_limit(Some(25)), 25);
    }

    #[test]
    fn api_error_validation_error_maps_to_bad_request() {
        let response = ApiError::new("req-1", "validation_error", "invalid input").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn overweight_maps_to_validation_error() {
        let err = PricingError::Overweight {
            max_kg: Decimal::new(70, 0),
        };
        let api = map_pricing_error("req-1".to_string(), &err);
        assert_eq!(api.error.code, "validation_error");
        assert_eq!(api.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn exchange_unavailable_maps_to_service_unavailable() {
        let err = PricingError::ExchangeUnavailable {
            reason: "upstream returned HTTP 503".to_string(),
        };
        let api = map_pricing_error("req-1".to_string(), &err);
        assert_eq!(api.error.code, "unavailable");
        assert_eq!(api.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
