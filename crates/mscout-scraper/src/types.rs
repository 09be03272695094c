use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Normalized product data for one listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub asin: String,
    pub title: String,
    /// Absent when the listing shows no buyable price.
    pub price_jpy: Option<Decimal>,
    /// Falls back to 500 g when the listing omits weight.
    pub weight_g: u32,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub images: Vec<String>,
    pub description: Option<String>,
    pub features: Vec<String>,
}

/// Response envelope used by every collector endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<RawProduct>,
}

/// Product payload as the collector returns it: price and weight arrive as
/// display text or bare numbers depending on the source page.
#[derive(Debug, Deserialize)]
pub(crate) struct RawProduct {
    pub title: Option<String>,
    pub price: Option<serde_json::Value>,
    pub weight: Option<serde_json::Value>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
}
