//! JPY→KRW exchange rate lookup with a TTL cache.
//!
//! Upstream is a free JSON endpoint returning `{"rates": {"KRW": <n>}}`.
//! Any upstream failure degrades to a fixed fallback rate so profit
//! calculations keep working while the source is down; only a forced
//! `refresh` surfaces the failure.

use std::time::{Duration, Instant};

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::PricingError;

/// Rate used when the upstream source is unavailable.
fn fallback_rate() -> Decimal {
    Decimal::new(95, 1)
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: std::collections::HashMap<String, f64>,
}

/// Thin HTTP client for the exchange rate endpoint.
pub struct ExchangeRateClient {
    client: reqwest::Client,
    api_url: String,
}

impl ExchangeRateClient {
    /// # Errors
    ///
    /// Returns [`PricingError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(api_url: impl Into<String>, timeout_secs: u64) -> Result<Self, PricingError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_url: api_url.into(),
        })
    }

    /// Fetches the current KRW-per-JPY rate.
    ///
    /// # Errors
    ///
    /// - [`PricingError::Http`] on network failure or timeout.
    /// - [`PricingError::ExchangeUnavailable`] on a non-2xx status, a
    ///   malformed body, or a response missing the KRW rate.
    pub async fn fetch_krw_per_jpy(&self) -> Result<Decimal, PricingError> {
        let response = self.client.get(&self.api_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PricingError::ExchangeUnavailable {
                reason: format!("upstream returned HTTP {status}"),
            });
        }

        let body: RatesResponse =
            response
                .json()
                .await
                .map_err(|e| PricingError::ExchangeUnavailable {
                    reason: format!("malformed rates body: {e}"),
                })?;

        let krw = body
            .rates
            .get("KRW")
            .copied()
            .ok_or_else(|| PricingError::ExchangeUnavailable {
                reason: "response has no KRW rate".to_string(),
            })?;

        Decimal::from_f64(krw).ok_or_else(|| PricingError::ExchangeUnavailable {
            reason: format!("KRW rate {krw} is not a finite number"),
        })
    }
}

struct CachedRate {
    rate: Decimal,
    fetched_at: Instant,
}

/// TTL cache over [`ExchangeRateClient`].
///
/// `rate` never fails: upstream failures are logged and the fallback rate
/// is cached like a fetched value, so a flapping source is hit at most once
/// per TTL window.
pub struct ExchangeRateCache {
    client: ExchangeRateClient,
    ttl: Duration,
    state: Mutex<Option<CachedRate>>,
}

impl ExchangeRateCache {
    #[must_use]
    pub fn new(client: ExchangeRateClient, ttl: Duration) -> Self {
        Self {
            client,
            ttl,
            state: Mutex::new(None),
        }
    }

    /// Current KRW-per-JPY rate, from cache when fresh.
    pub async fn rate(&self) -> Decimal {
        let mut state = self.state.lock().await;
        if let Some(cached) = state.as_ref() {
            if cached.fetched_at.elapsed() < self.ttl {
                return cached.rate;
            }
        }

        let rate = match self.client.fetch_krw_per_jpy().await {
            Ok(rate) => rate,
            Err(e) => {
                tracing::warn!(error = %e, "exchange rate fetch failed, using fallback");
                fallback_rate()
            }
        };
        *state = Some(CachedRate {
            rate,
            fetched_at: Instant::now(),
        });
        rate
    }

    /// Drops the cached value and fetches synchronously.
    ///
    /// # Errors
    ///
    /// Propagates the upstream failure; the cache is left empty so the next
    /// `rate` call retries.
    pub async fn refresh(&self) -> Result<Decimal, PricingError> {
        let mut state = self.state.lock().await;
        *state = None;
        let rate = self.client.fetch_krw_per_jpy().await?;
        *state = Some(CachedRate {
            rate,
            fetched_at: Instant::now(),
        });
        Ok(rate)
    }

    /// Converts a JPY amount to KRW at the current rate, rounded to 2 dp.
    pub async fn convert_jpy_to_krw(&self, amount_jpy: Decimal) -> Decimal {
        let rate = self.rate().await;
        (amount_jpy * rate).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn rates_body(krw: f64) -> serde_json::Value {
        serde_json::json!({ "base": "JPY", "rates": { "KRW": krw, "USD": 0.0067 } })
    }

    async fn client_for(server: &MockServer) -> ExchangeRateClient {
        ExchangeRateClient::new(format!("{}/v4/latest/JPY", server.uri()), 5).unwrap()
    }

    #[tokio::test]
    async fn fetch_extracts_the_krw_rate() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/latest/JPY"))
            .respond_with(ResponseTemplate::new(200).set_body_json(rates_body(9.43)))
            .mount(&server)
            .await;

        let rate = client_for(&server).await.fetch_krw_per_jpy().await.unwrap();
        assert_eq!(rate, Decimal::from_f64(9.43).unwrap());
    }

    #[tokio::test]
    async fn missing_krw_key_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "rates": { "USD": 0.0067 } })),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .fetch_krw_per_jpy()
            .await
            .expect_err("no KRW key");
        assert!(matches!(err, PricingError::ExchangeUnavailable { .. }));
    }

    #[tokio::test]
    async fn upstream_failure_yields_the_cached_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let cache = ExchangeRateCache::new(client_for(&server).await, Duration::from_secs(3600));
        assert_eq!(cache.rate().await, Decimal::new(95, 1));
        // The fallback is cached: no second upstream hit inside the TTL.
        assert_eq!(cache.rate().await, Decimal::new(95, 1));
    }

    #[tokio::test]
    async fn expired_entries_are_refetched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(rates_body(9.2)))
            .expect(2)
            .mount(&server)
            .await;

        let cache = ExchangeRateCache::new(client_for(&server).await, Duration::ZERO);
        cache.rate().await;
        cache.rate().await;
    }

    #[tokio::test]
    async fn refresh_propagates_upstream_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let cache = ExchangeRateCache::new(client_for(&server).await, Duration::from_secs(3600));
        assert!(cache.refresh().await.is_err());
    }

    #[tokio::test]
    async fn convert_rounds_to_two_decimal_places() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(rates_body(9.435)))
            .mount(&server)
            .await;

        let cache = ExchangeRateCache::new(client_for(&server).await, Duration::from_secs(3600));
        let krw = cache.convert_jpy_to_krw(Decimal::new(1234, 0)).await;
        // 1234 × 9.435 = 11642.79
        assert_eq!(krw, Decimal::new(1_164_279, 2));
    }
}
