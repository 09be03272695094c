use super::*;

#[test]
fn price_from_yen_display_text() {
    let raw = serde_json::json!("¥1,234");
    assert_eq!(parse_price_jpy(&raw), Some(Decimal::new(1234, 0)));
}

#[test]
fn price_from_suffixed_text() {
    let raw = serde_json::json!("12,800円");
    assert_eq!(parse_price_jpy(&raw), Some(Decimal::new(12_800, 0)));
}

#[test]
fn price_from_bare_number() {
    let raw = serde_json::json!(980);
    assert_eq!(parse_price_jpy(&raw), Some(Decimal::new(980, 0)));
}

#[test]
fn price_with_decimal_point() {
    let raw = serde_json::json!("¥1,234.50");
    assert_eq!(parse_price_jpy(&raw), Some(Decimal::new(123_450, 2)));
}

#[test]
fn unpriced_listing_has_no_price() {
    assert_eq!(parse_price_jpy(&serde_json::json!("currently unavailable")), None);
    assert_eq!(parse_price_jpy(&serde_json::json!(null)), None);
}

#[test]
fn weight_from_gram_text() {
    assert_eq!(parse_weight_g(Some(&serde_json::json!("640 g"))), 640);
}

#[test]
fn weight_from_kilogram_text() {
    assert_eq!(parse_weight_g(Some(&serde_json::json!("1.2kg"))), 1200);
}

#[test]
fn bare_number_is_grams() {
    assert_eq!(parse_weight_g(Some(&serde_json::json!(750))), 750);
}

#[test]
fn missing_or_unusable_weight_defaults() {
    assert_eq!(parse_weight_g(None), DEFAULT_WEIGHT_G);
    assert_eq!(parse_weight_g(Some(&serde_json::json!("n/a"))), DEFAULT_WEIGHT_G);
    assert_eq!(parse_weight_g(Some(&serde_json::json!(0))), DEFAULT_WEIGHT_G);
}
