//! HTTP client for the product collection service.
//!
//! The collector is a separate service that scrapes the source marketplace
//! and returns translated product data; this crate wraps its API and
//! normalizes the loosely-typed payload (price text, weight text) into
//! typed records.

pub mod client;
pub mod error;
pub mod parse;
pub mod types;

pub use client::ScraperClient;
pub use error::ScraperError;
pub use types::ProductRecord;
