//! Normalization of the collector's loosely-typed price and weight fields.

use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

/// Weight assumed when the listing carries none.
pub const DEFAULT_WEIGHT_G: u32 = 500;

fn price_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([0-9][0-9,]*(?:\.[0-9]+)?)").expect("static price pattern"))
}

fn weight_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)([0-9]+(?:\.[0-9]+)?)\s*(kg|g)").expect("static weight pattern")
    })
}

/// Extracts a JPY price from a collector price field.
///
/// Accepts bare numbers and display strings like `"¥1,234"` or
/// `"1,234円"`. Returns `None` when no digits are present.
#[must_use]
pub fn parse_price_jpy(raw: &serde_json::Value) -> Option<Decimal> {
    match raw {
        serde_json::Value::Number(n) => n
            .as_f64()
            .and_then(Decimal::from_f64)
            .map(|d| d.normalize()),
        serde_json::Value::String(s) => {
            let captures = price_re().captures(s)?;
            let digits = captures.get(1)?.as_str().replace(',', "");
            Decimal::from_str(&digits).ok()
        }
        _ => None,
    }
}

/// Extracts a weight in grams from a collector weight field.
///
/// Bare numbers are taken as grams; strings may carry a `g` or `kg` unit
/// (`"640 g"`, `"1.2kg"`). Anything unusable falls back to
/// [`DEFAULT_WEIGHT_G`].
#[must_use]
pub fn parse_weight_g(raw: Option<&serde_json::Value>) -> u32 {
    let Some(raw) = raw else {
        return DEFAULT_WEIGHT_G;
    };
    match raw {
        serde_json::Value::Number(n) => n
            .as_f64()
            .filter(|g| *g > 0.0)
            .and_then(|g| u32::try_from(g.round() as i64).ok())
            .unwrap_or(DEFAULT_WEIGHT_G),
        serde_json::Value::String(s) => parse_weight_text(s).unwrap_or(DEFAULT_WEIGHT_G),
        _ => DEFAULT_WEIGHT_G,
    }
}

fn parse_weight_text(s: &str) -> Option<u32> {
    let captures = weight_re().captures(s)?;
    let value: f64 = captures.get(1)?.as_str().parse().ok()?;
    let grams = match captures.get(2)?.as_str().to_ascii_lowercase().as_str() {
        "kg" => value * 1000.0,
        _ => value,
    };
    if grams <= 0.0 {
        return None;
    }
    u32::try_from(grams.round() as i64).ok()
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod parse_test;
