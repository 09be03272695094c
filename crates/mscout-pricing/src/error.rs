use std::path::PathBuf;

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PricingError {
    #[error("no rate schedule for shipping tier \"{tier}\"")]
    UnknownTier { tier: String },

    #[error("weight exceeds the {max_kg} kg limit for this tier")]
    Overweight { max_kg: Decimal },

    #[error(
        "target margin is unreachable with the platform fee; maximum achievable is {max_achievable}%"
    )]
    MarginTooHigh { max_achievable: Decimal },

    #[error("rate book I/O error at {path}: {source}")]
    RateBookIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("rate book parse error at {path}: {source}")]
    RateBookParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("exchange rate unavailable: {reason}")]
    ExchangeUnavailable { reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
