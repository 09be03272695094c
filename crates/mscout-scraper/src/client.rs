use std::time::Duration;

use reqwest::Client;

use crate::error::ScraperError;
use crate::parse::{parse_price_jpy, parse_weight_g};
use crate::types::{Envelope, ProductRecord};

/// HTTP client for the collector service.
///
/// One instance is shared across worker tasks; the underlying `reqwest`
/// client pools connections. The collector itself handles source-side
/// pacing, so this client does not retry — callers decide what a failed
/// item means.
pub struct ScraperClient {
    client: Client,
    base_url: String,
}

impl ScraperClient {
    /// Creates a client with the configured timeout and `User-Agent`.
    ///
    /// `base_url` is the collector's API root, e.g.
    /// `http://localhost:8001/api/v1`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        base_url: impl Into<String>,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Fetches and normalizes one product by ASIN.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::Http`] — network failure or timeout.
    /// - [`ScraperError::UnexpectedStatus`] — non-2xx response.
    /// - [`ScraperError::Deserialize`] — body is not a valid envelope.
    /// - [`ScraperError::SourceFailure`] — the collector reported
    ///   `success: false` (listing gone, blocked page, etc.).
    /// - [`ScraperError::MissingData`] — `success: true` but no usable
    ///   product payload.
    pub async fn fetch_product(&self, asin: &str) -> Result<ProductRecord, ScraperError> {
        let url = format!("{}/scrape/amazon", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("asin", asin), ("translate", "true")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.text().await?;
        let envelope: Envelope =
            serde_json::from_str(&body).map_err(|source| ScraperError::Deserialize {
                context: format!("product {asin}"),
                source,
            })?;

        if !envelope.success {
            return Err(ScraperError::SourceFailure {
                asin: asin.to_string(),
                message: envelope
                    .message
                    .unwrap_or_else(|| "no failure message".to_string()),
            });
        }

        let Some(raw) = envelope.data else {
            return Err(ScraperError::MissingData {
                asin: asin.to_string(),
            });
        };

        let title = raw
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(ToString::to_string)
            .ok_or_else(|| ScraperError::MissingData {
                asin: asin.to_string(),
            })?;

        let price_jpy = raw.price.as_ref().and_then(parse_price_jpy);
        let weight_g = parse_weight_g(raw.weight.as_ref());

        Ok(ProductRecord {
            asin: asin.to_string(),
            title,
            price_jpy,
            weight_g,
            category: raw.category,
            subcategory: raw.subcategory,
            images: raw.images,
            description: raw.description,
            features: raw.features,
        })
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod client_test;
