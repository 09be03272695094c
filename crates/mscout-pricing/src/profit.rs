//! Forward and inverse profit calculations.
//!
//! `calculate` is pure: same input, rate book, and exchange rate always
//! produce the same breakdown. Money stays in `Decimal` throughout; KRW
//! amounts other than the converted cost are rounded to whole won, the
//! converted cost and margin to 2 dp.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use mscout_core::{platform_fee_rate, Category, ShippingTier, Subcategory};

use crate::error::PricingError;
use crate::rates::RateBook;

/// Everything the forward calculation needs about one listing.
#[derive(Debug, Clone)]
pub struct ProfitInput {
    pub price_jpy: Decimal,
    pub weight_g: u32,
    pub tier: ShippingTier,
    pub category: Category,
    pub subcategory: Option<Subcategory>,
    pub origin_shipping_jpy: Decimal,
    pub local_shipping_krw: Decimal,
    pub packaging_fee_krw: Decimal,
    pub sell_price_krw: Decimal,
}

/// Full cost/profit breakdown. Every intermediate stage is reported so a
/// stored analysis can be audited without re-running the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitBreakdown {
    pub origin_costs_jpy: Decimal,
    pub international_shipping_jpy: Decimal,
    pub total_origin_cost_jpy: Decimal,
    pub exchange_rate: Decimal,
    pub converted_cost_krw: Decimal,
    /// Shipments at or under the 200 000 KRW threshold owe no duty or VAT.
    pub tax_exempt: bool,
    /// Informational: customs and VAT are buyer-borne and excluded from
    /// `total_cost_krw`.
    pub customs_duty_krw: Decimal,
    pub vat_krw: Decimal,
    pub local_costs_krw: Decimal,
    pub total_cost_krw: Decimal,
    pub sell_price_krw: Decimal,
    pub platform_fee_rate: Decimal,
    pub platform_fee_krw: Decimal,
    pub net_profit_krw: Decimal,
    pub margin_percent: Decimal,
}

/// Recommended sell price plus the realized breakdown at that price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub recommended_price_krw: Decimal,
    pub target_margin_percent: u32,
    pub breakdown: ProfitBreakdown,
}

fn tax_exemption_threshold() -> Decimal {
    Decimal::new(200_000, 0)
}

fn vat_rate() -> Decimal {
    Decimal::new(10, 2)
}

fn round_krw(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Runs the forward calculation.
///
/// # Errors
///
/// Returns a shipping-fee domain error (unknown tier, overweight) from the
/// rate book lookup.
pub fn calculate(
    input: &ProfitInput,
    book: &RateBook,
    exchange_rate: Decimal,
) -> Result<ProfitBreakdown, PricingError> {
    let origin_costs_jpy = input.price_jpy + input.origin_shipping_jpy;
    let international_shipping_jpy = book.shipping_fee(input.weight_g, input.tier)?;
    let total_origin_cost_jpy = origin_costs_jpy + international_shipping_jpy;

    let converted_cost_krw = (total_origin_cost_jpy * exchange_rate)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

    let tax_exempt = converted_cost_krw <= tax_exemption_threshold();
    let (customs_duty_krw, vat_krw) = if tax_exempt {
        (Decimal::ZERO, Decimal::ZERO)
    } else {
        let duty = round_krw(converted_cost_krw * input.category.customs_rate());
        let vat = round_krw((converted_cost_krw + duty) * vat_rate());
        (duty, vat)
    };

    let local_costs_krw = input.local_shipping_krw + input.packaging_fee_krw;
    let total_cost_krw = converted_cost_krw + local_costs_krw;

    let fee_rate = platform_fee_rate(input.category, input.subcategory);
    let platform_fee_krw = round_krw(input.sell_price_krw * fee_rate);

    let net_profit_krw = input.sell_price_krw - total_cost_krw - platform_fee_krw;
    let margin_percent = if input.sell_price_krw.is_zero() {
        Decimal::ZERO
    } else {
        (net_profit_krw / input.sell_price_krw * Decimal::new(100, 0))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    };

    Ok(ProfitBreakdown {
        origin_costs_jpy,
        international_shipping_jpy,
        total_origin_cost_jpy,
        exchange_rate,
        converted_cost_krw,
        tax_exempt,
        customs_duty_krw,
        vat_krw,
        local_costs_krw,
        total_cost_krw,
        sell_price_krw: input.sell_price_krw,
        platform_fee_rate: fee_rate,
        platform_fee_krw,
        net_profit_krw,
        margin_percent,
    })
}

/// Inverse calculation: the lowest 100-won price step hitting the target
/// margin, with the realized breakdown at that price.
///
/// The platform fee is proportional to the sell price, so the price solves
/// `price × (1 − target − fee_rate) = total_cost`, then rounds up to the
/// next 100 KRW.
///
/// # Errors
///
/// - Shipping-fee domain errors from the forward cost run.
/// - [`PricingError::MarginTooHigh`] when `target + fee_rate >= 100%`; the
///   error carries the maximum achievable margin (fee headroom minus a 5
///   point buffer).
pub fn recommend_price(
    input: &ProfitInput,
    target_margin_percent: u32,
    book: &RateBook,
    exchange_rate: Decimal,
) -> Result<Recommendation, PricingError> {
    let cost_run = calculate(
        &ProfitInput {
            sell_price_krw: Decimal::ZERO,
            ..input.clone()
        },
        book,
        exchange_rate,
    )?;

    let fee_rate = platform_fee_rate(input.category, input.subcategory);
    let target = Decimal::from(target_margin_percent) / Decimal::new(100, 0);
    let denom = Decimal::ONE - target - fee_rate;
    if denom <= Decimal::ZERO {
        let max_achievable = ((Decimal::ONE - fee_rate) * Decimal::new(100, 0)
            - Decimal::new(5, 0))
        .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
        return Err(PricingError::MarginTooHigh { max_achievable });
    }

    let hundred = Decimal::new(100, 0);
    let recommended_price_krw = (cost_run.total_cost_krw / denom / hundred).ceil() * hundred;

    let breakdown = calculate(
        &ProfitInput {
            sell_price_krw: recommended_price_krw,
            ..input.clone()
        },
        book,
        exchange_rate,
    )?;

    Ok(Recommendation {
        recommended_price_krw,
        target_margin_percent,
        breakdown,
    })
}
