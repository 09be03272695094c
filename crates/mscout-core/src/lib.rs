use thiserror::Error;

mod app_config;
mod categories;
mod config;
mod jobs;

pub use app_config::{AppConfig, Environment};
pub use categories::{platform_fee_rate, Category, ShippingTier, Subcategory};
pub use config::{load_app_config, load_app_config_from_env};
pub use jobs::{ItemOutcome, ItemResult, ItemStatus, JobSettings, JobStatus, JobType};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for env var {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
