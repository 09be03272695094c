use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("collector reported failure for {asin}: {message}")]
    SourceFailure { asin: String, message: String },

    #[error("collector returned no product data for {asin}")]
    MissingData { asin: String },
}

impl ScraperError {
    /// Whether a retry at a later time could plausibly succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            ScraperError::Http(_) => true,
            ScraperError::UnexpectedStatus { status, .. } => {
                *status == 429 || (500..=599).contains(status)
            }
            ScraperError::Deserialize { .. }
            | ScraperError::SourceFailure { .. }
            | ScraperError::MissingData { .. } => false,
        }
    }
}
