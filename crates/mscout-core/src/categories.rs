//! Marketplace category, subcategory, and shipping-tier domain types.
//!
//! Categories and subcategories are closed enums so the customs-rate and
//! platform-fee lookups are total functions: every variant is matched, and
//! adding a variant without a rate fails to compile. External strings parse
//! through `parse_or_default`/`parse`, which absorb unknown values instead
//! of erroring — unknown categories fall back to the baseline rates.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Named shipping service level, each with its own rate schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShippingTier {
    Economy,
    Premium,
}

impl ShippingTier {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ShippingTier::Economy => "economy",
            ShippingTier::Premium => "premium",
        }
    }

    /// Parses a tier name; returns `None` for unsupported tiers.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "economy" => Some(ShippingTier::Economy),
            "premium" => Some(ShippingTier::Premium),
            _ => None,
        }
    }
}

impl std::fmt::Display for ShippingTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level product category. Determines the customs-duty rate and the
/// default platform fee rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Electronics,
    Beauty,
    ToysHobbies,
    Fashion,
    Food,
    Books,
    DailyNecessities,
    Automotive,
    Sports,
    Baby,
}

impl Category {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Electronics => "electronics",
            Category::Beauty => "beauty",
            Category::ToysHobbies => "toys_hobbies",
            Category::Fashion => "fashion",
            Category::Food => "food",
            Category::Books => "books",
            Category::DailyNecessities => "daily_necessities",
            Category::Automotive => "automotive",
            Category::Sports => "sports",
            Category::Baby => "baby",
        }
    }

    /// Parses a category slug, absorbing legacy aliases (`cosmetics`,
    /// `general`) and falling back to `DailyNecessities` for anything
    /// unrecognized so downstream rate lookups use the baseline rates.
    #[must_use]
    pub fn parse_or_default(s: &str) -> Self {
        match s {
            "electronics" => Category::Electronics,
            "beauty" | "cosmetics" => Category::Beauty,
            "toys_hobbies" => Category::ToysHobbies,
            "fashion" => Category::Fashion,
            "food" => Category::Food,
            "books" => Category::Books,
            "automotive" => Category::Automotive,
            "sports" => Category::Sports,
            "baby" => Category::Baby,
            _ => Category::DailyNecessities,
        }
    }

    /// Customs-duty rate applied above the tax-exemption threshold.
    ///
    /// Informational only — customs and VAT are buyer-borne and never enter
    /// the seller's cost subtraction.
    #[must_use]
    pub fn customs_rate(self) -> Decimal {
        match self {
            Category::Fashion => Decimal::new(13, 2),
            Category::Food => Decimal::new(30, 2),
            Category::Books => Decimal::ZERO,
            Category::Electronics
            | Category::Beauty
            | Category::ToysHobbies
            | Category::DailyNecessities
            | Category::Automotive
            | Category::Sports
            | Category::Baby => Decimal::new(8, 2),
        }
    }

    /// Default platform fee rate for the category (fraction of sell price).
    #[must_use]
    pub fn fee_rate(self) -> Decimal {
        match self {
            Category::Electronics | Category::DailyNecessities => Decimal::new(78, 3),
            Category::Beauty => Decimal::new(96, 3),
            Category::ToysHobbies | Category::Sports | Category::Books => Decimal::new(108, 3),
            Category::Fashion => Decimal::new(105, 3),
            Category::Food => Decimal::new(106, 3),
            Category::Automotive | Category::Baby => Decimal::new(10, 2),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subcategory with a platform fee rate that overrides the category default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subcategory {
    Computers,
    KeyboardsMouse,
    Cameras,
    Tablets,
    Games,
    Monitors,
    Tv,
    RcToys,
    Figures,
    Clothing,
    Accessories,
}

impl Subcategory {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Subcategory::Computers => "computers",
            Subcategory::KeyboardsMouse => "keyboards_mouse",
            Subcategory::Cameras => "cameras",
            Subcategory::Tablets => "tablets",
            Subcategory::Games => "games",
            Subcategory::Monitors => "monitors",
            Subcategory::Tv => "tv",
            Subcategory::RcToys => "rc_toys",
            Subcategory::Figures => "figures",
            Subcategory::Clothing => "clothing",
            Subcategory::Accessories => "accessories",
        }
    }

    /// Parses a subcategory slug; unknown slugs carry no fee override.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "computers" => Some(Subcategory::Computers),
            "keyboards_mouse" => Some(Subcategory::KeyboardsMouse),
            "cameras" => Some(Subcategory::Cameras),
            "tablets" => Some(Subcategory::Tablets),
            "games" => Some(Subcategory::Games),
            "monitors" => Some(Subcategory::Monitors),
            "tv" => Some(Subcategory::Tv),
            "rc_toys" => Some(Subcategory::RcToys),
            "figures" => Some(Subcategory::Figures),
            "clothing" => Some(Subcategory::Clothing),
            "accessories" => Some(Subcategory::Accessories),
            _ => None,
        }
    }

    /// Platform fee rate override for the subcategory.
    #[must_use]
    pub fn fee_rate(self) -> Decimal {
        match self {
            Subcategory::Computers | Subcategory::Tablets => Decimal::new(5, 2),
            Subcategory::KeyboardsMouse => Decimal::new(65, 3),
            Subcategory::Cameras | Subcategory::Tv => Decimal::new(58, 3),
            Subcategory::Games => Decimal::new(68, 3),
            Subcategory::Monitors => Decimal::new(45, 3),
            Subcategory::RcToys => Decimal::new(78, 3),
            Subcategory::Figures => Decimal::new(108, 3),
            Subcategory::Clothing | Subcategory::Accessories => Decimal::new(105, 3),
        }
    }
}

impl std::fmt::Display for Subcategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Effective platform fee rate for a category/subcategory pair.
///
/// Subcategory override wins over the category default, which wins over the
/// global baseline (7.8%, already the `DailyNecessities` default).
#[must_use]
pub fn platform_fee_rate(category: Category, subcategory: Option<Subcategory>) -> Decimal {
    subcategory.map_or_else(|| category.fee_rate(), Subcategory::fee_rate)
}
