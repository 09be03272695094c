//! Collection-job and collected-item domain types shared across crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a collection job sources its ASINs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
    SingleAsin,
    Url,
    Keyword,
    Category,
    Bulk,
}

impl JobType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            JobType::SingleAsin => "SINGLE_ASIN",
            JobType::Url => "URL",
            JobType::Keyword => "KEYWORD",
            JobType::Category => "CATEGORY",
            JobType::Bulk => "BULK",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SINGLE_ASIN" => Some(JobType::SingleAsin),
            "URL" => Some(JobType::Url),
            "KEYWORD" => Some(JobType::Keyword),
            "CATEGORY" => Some(JobType::Category),
            "BULK" => Some(JobType::Bulk),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a collection job.
///
/// Legal transitions: `Pending -> Processing -> Completed | Failed`,
/// `Pending -> Cancelled`, `Pending -> Failed` (stale sweep), and
/// `Processing -> Failed` (timeout or stuck sweep). Terminal states never
/// transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Processing => "PROCESSING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
            JobStatus::Cancelled => "CANCELLED",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(JobStatus::Pending),
            "PROCESSING" => Some(JobStatus::Processing),
            "COMPLETED" => Some(JobStatus::Completed),
            "FAILED" => Some(JobStatus::Failed),
            "CANCELLED" => Some(JobStatus::Cancelled),
            _ => None,
        }
    }

    /// Terminal states accept no further transitions.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a collected item row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    Pending,
    Collecting,
    Collected,
    Analyzed,
    Error,
}

impl ItemStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::Pending => "PENDING",
            ItemStatus::Collecting => "COLLECTING",
            ItemStatus::Collected => "COLLECTED",
            ItemStatus::Analyzed => "ANALYZED",
            ItemStatus::Error => "ERROR",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(ItemStatus::Pending),
            "COLLECTING" => Some(ItemStatus::Collecting),
            "COLLECTED" => Some(ItemStatus::Collected),
            "ANALYZED" => Some(ItemStatus::Analyzed),
            "ERROR" => Some(ItemStatus::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-job knobs carried in the job's `settings` JSON column.
///
/// Every field has a default so a job submitted with `"settings": {}` (or no
/// settings at all) behaves sensibly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSettings {
    /// Run the profit analysis on each item right after collection.
    pub auto_analyze: bool,
    /// Target profit margin (percent) used when recommending a sell price.
    pub target_margin: u32,
    /// Domestic shipping to the consolidation point, in JPY.
    pub origin_shipping_jpy: u32,
    /// Local delivery on the destination side, in KRW.
    pub local_shipping_krw: u32,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            auto_analyze: true,
            target_margin: 10,
            origin_shipping_jpy: 0,
            local_shipping_krw: 0,
        }
    }
}

/// Outcome of processing a single item within a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemOutcome {
    Success,
    Error,
}

/// One entry in a job's append-only `results` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemResult {
    pub asin: String,
    pub outcome: ItemOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub processed_at: DateTime<Utc>,
}

impl ItemResult {
    #[must_use]
    pub fn success(asin: impl Into<String>) -> Self {
        Self {
            asin: asin.into(),
            outcome: ItemOutcome::Success,
            error: None,
            processed_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn error(asin: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            asin: asin.into(),
            outcome: ItemOutcome::Error,
            error: Some(message.into()),
            processed_at: Utc::now(),
        }
    }
}
