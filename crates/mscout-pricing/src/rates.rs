//! Shipping rate book: per-tier schedules keyed by billed weight.
//!
//! Fees are quoted in rate points and converted to JPY via the book's
//! `exchange_rate_p_to_jpy` multiplier. Billed weight is the actual weight
//! rounded up to the next 0.5 kg step. The `rates` table is sparse; weights
//! without an entry fall back to the linear increment formula.

use std::collections::BTreeMap;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use mscout_core::ShippingTier;

use crate::error::PricingError;

/// Rate schedule for a single shipping tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateSchedule {
    /// Rate points for the minimum billable weight (0.5 kg).
    pub base_rate: Decimal,
    /// Step size in kg for the fallback formula.
    pub increment_weight: Decimal,
    /// Rate points added per step above 0.5 kg.
    pub increment_rate: Decimal,
    /// Maximum billable weight in kg; heavier parcels are rejected.
    pub max_weight: Decimal,
    /// Sparse lookup table. Integral weights use integer keys ("1", not
    /// "1.0"); half steps use "1.5"-style keys.
    pub rates: BTreeMap<String, Decimal>,
}

impl RateSchedule {
    /// Rate points for a billed weight, via table lookup or the fallback
    /// formula.
    fn rate_points(&self, billed_kg: Decimal) -> Decimal {
        if let Some(rate) = self.rates.get(&weight_key(billed_kg)) {
            return *rate;
        }
        let half = Decimal::new(5, 1);
        self.base_rate + ((billed_kg - half) / self.increment_weight) * self.increment_rate
    }
}

/// The full rate document: one schedule per tier plus the points-to-JPY
/// conversion rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateBook {
    pub exchange_rate_p_to_jpy: Decimal,
    pub tiers: BTreeMap<String, RateSchedule>,
}

impl RateBook {
    /// International shipping fee in whole JPY for a parcel of `weight_g`
    /// grams on the given tier.
    ///
    /// Weight is billed in 0.5 kg steps, rounded up.
    ///
    /// # Errors
    ///
    /// - [`PricingError::UnknownTier`] when the book has no schedule for
    ///   the tier.
    /// - [`PricingError::Overweight`] when the billed weight exceeds the
    ///   tier's `max_weight`.
    pub fn shipping_fee(&self, weight_g: u32, tier: ShippingTier) -> Result<Decimal, PricingError> {
        let schedule = self
            .tiers
            .get(tier.as_str())
            .ok_or_else(|| PricingError::UnknownTier {
                tier: tier.as_str().to_string(),
            })?;

        let half_steps = weight_g.div_ceil(500).max(1);
        let billed_kg = Decimal::new(i64::from(half_steps) * 5, 1);
        if billed_kg > schedule.max_weight {
            return Err(PricingError::Overweight {
                max_kg: schedule.max_weight,
            });
        }

        let fee = schedule.rate_points(billed_kg) * self.exchange_rate_p_to_jpy;
        Ok(fee.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
    }
}

/// Lookup key for a billed weight: trailing zeros stripped so whole
/// kilograms key as integers.
fn weight_key(billed_kg: Decimal) -> String {
    billed_kg.normalize().to_string()
}

/// Builds the built-in rate book: economy from 9.00 points, premium from
/// 8.50, both stepping 1.00 point per 0.5 kg up to 70 kg, at 100 JPY per
/// point. Used when no rate blob has been installed yet.
#[must_use]
pub fn default_rate_book() -> RateBook {
    let mut tiers = BTreeMap::new();
    tiers.insert(
        ShippingTier::Economy.as_str().to_string(),
        generated_schedule(Decimal::new(900, 2)),
    );
    tiers.insert(
        ShippingTier::Premium.as_str().to_string(),
        generated_schedule(Decimal::new(850, 2)),
    );
    RateBook {
        exchange_rate_p_to_jpy: Decimal::new(100, 0),
        tiers,
    }
}

fn generated_schedule(base_rate: Decimal) -> RateSchedule {
    let increment_weight = Decimal::new(5, 1);
    let increment_rate = Decimal::new(100, 2);
    let max_weight = Decimal::new(70, 0);
    let half = Decimal::new(5, 1);

    let mut rates = BTreeMap::new();
    for step in 1..=140_i64 {
        let kg = Decimal::new(step * 5, 1);
        let rate = base_rate + ((kg - half) / increment_weight) * increment_rate;
        rates.insert(weight_key(kg), rate.normalize());
    }

    RateSchedule {
        base_rate,
        increment_weight,
        increment_rate,
        max_weight,
        rates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_kilograms_use_integer_keys() {
        assert_eq!(weight_key(Decimal::new(10, 1)), "1");
        assert_eq!(weight_key(Decimal::new(5, 1)), "0.5");
        assert_eq!(weight_key(Decimal::new(15, 1)), "1.5");
        assert_eq!(weight_key(Decimal::new(700, 1)), "70");
    }

    #[test]
    fn six_hundred_grams_economy_bills_one_kilogram() {
        let book = default_rate_book();
        let fee = book
            .shipping_fee(600, ShippingTier::Economy)
            .expect("fee for 600 g");
        // 1 kg economy: 9.00 + 1.00 points, at 100 JPY per point.
        assert_eq!(fee, Decimal::new(1000, 0));
    }

    #[test]
    fn minimum_billable_weight_is_half_a_kilogram() {
        let book = default_rate_book();
        let fee = book
            .shipping_fee(120, ShippingTier::Economy)
            .expect("fee for 120 g");
        assert_eq!(fee, Decimal::new(900, 0));
    }

    #[test]
    fn premium_undercuts_economy_at_equal_weight() {
        let book = default_rate_book();
        let economy = book.shipping_fee(2000, ShippingTier::Economy).unwrap();
        let premium = book.shipping_fee(2000, ShippingTier::Premium).unwrap();
        assert!(premium < economy);
    }

    #[test]
    fn fee_is_monotone_in_weight() {
        let book = default_rate_book();
        let mut last = Decimal::ZERO;
        for weight_g in (500..=10_000).step_by(250) {
            let fee = book.shipping_fee(weight_g, ShippingTier::Economy).unwrap();
            assert!(fee >= last, "fee dropped at {weight_g} g");
            last = fee;
        }
    }

    #[test]
    fn overweight_parcels_are_rejected_with_the_limit() {
        let book = default_rate_book();
        // 70 001 g bills as 70.5 kg, just over the 70 kg cap.
        let err = book
            .shipping_fee(70_001, ShippingTier::Economy)
            .expect_err("over the cap");
        match err {
            PricingError::Overweight { max_kg } => assert_eq!(max_kg, Decimal::new(70, 0)),
            other => panic!("expected Overweight, got {other:?}"),
        }
        // Exactly 70 kg is still billable.
        assert!(book.shipping_fee(70_000, ShippingTier::Economy).is_ok());
    }

    #[test]
    fn sparse_table_entry_overrides_the_formula() {
        let mut book = default_rate_book();
        let schedule = book.tiers.get_mut("economy").unwrap();
        // Promotional rate for exactly 1 kg, keyed as "1".
        schedule.rates.insert("1".to_string(), Decimal::new(777, 2));
        let fee = book.shipping_fee(1000, ShippingTier::Economy).unwrap();
        assert_eq!(fee, Decimal::new(777, 0));
    }

    #[test]
    fn missing_tier_is_a_domain_error() {
        let mut book = default_rate_book();
        book.tiers.remove("premium");
        let err = book
            .shipping_fee(1000, ShippingTier::Premium)
            .expect_err("no premium schedule");
        assert!(matches!(err, PricingError::UnknownTier { ref tier } if tier == "premium"));
    }

    #[test]
    fn formula_covers_weights_missing_from_the_sparse_table() {
        let schedule = RateSchedule {
            base_rate: Decimal::new(900, 2),
            increment_weight: Decimal::new(5, 1),
            increment_rate: Decimal::new(100, 2),
            max_weight: Decimal::new(70, 0),
            rates: BTreeMap::new(),
        };
        // 12.5 kg: 9.00 + 24 steps of 1.00 = 33.00 points.
        assert_eq!(
            schedule.rate_points(Decimal::new(125, 1)).normalize(),
            Decimal::new(33, 0)
        );
    }

    #[test]
    fn rate_book_round_trips_through_json() {
        let book = default_rate_book();
        let json = serde_json::to_string(&book).unwrap();
        let parsed: RateBook = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, book);
    }
}
