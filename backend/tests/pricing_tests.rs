//! Pricing tests
//!
//! Stateless calculators and spreadsheet edits persisted on a product.

mod common;

use common::*;
use proptest::prelude::*;
use procurement_backend::error::AppError;
use procurement_backend::services::pricing::{
    discount, price, ratio, DiscountRequest, PriceRequest, RatioRequest,
};
use shared::{Channel, PricingEdit};
use uuid::Uuid;

// ============================================================================
// Calculators
// ============================================================================

#[test]
fn test_ratio_between_units() {
    let response = ratio(&RatioRequest {
        purchase_unit: "kg".to_string(),
        selling_unit: "g".to_string(),
        selling_quantity: dec("250"),
    })
    .unwrap();
    assert_eq!(response.ratio, dec("0.25"));
    assert!(response.convertible);

    let response = ratio(&RatioRequest {
        purchase_unit: "dozen".to_string(),
        selling_unit: "pcs".to_string(),
        selling_quantity: dec("6"),
    })
    .unwrap();
    assert_eq!(response.ratio, dec("0.5"));
}

#[test]
fn test_ratio_refuses_containers_and_mixed_categories() {
    for (purchase, selling) in [("box", "box"), ("kg", "l"), ("kg", "furlong")] {
        let result = ratio(&RatioRequest {
            purchase_unit: purchase.to_string(),
            selling_unit: selling.to_string(),
            selling_quantity: dec("1"),
        });
        assert!(
            matches!(result, Err(AppError::IncompatibleUnits { .. })),
            "{} -> {} should be incompatible",
            selling,
            purchase
        );
    }
}

#[test]
fn test_price_and_override() {
    let plain = price(&PriceRequest {
        purchase_price: dec("10"),
        ratio: dec("4"),
        multiplier: dec("1.5"),
        manual_price_override: None,
    })
    .unwrap();
    assert_eq!(plain.calculated_price, dec("3.75"));
    assert_eq!(plain.displayed_price, dec("3.75"));
    assert!(!plain.has_override);

    let overridden = price(&PriceRequest {
        purchase_price: dec("10"),
        ratio: dec("4"),
        multiplier: dec("1.5"),
        manual_price_override: Some(dec("4.00")),
    })
    .unwrap();
    assert_eq!(overridden.displayed_price, dec("4.00"));
    assert!(overridden.has_override);

    let same = price(&PriceRequest {
        purchase_price: dec("10"),
        ratio: dec("4"),
        multiplier: dec("1.5"),
        manual_price_override: Some(dec("3.75")),
    })
    .unwrap();
    assert!(!same.has_override);
}

#[test]
fn test_price_with_zero_ratio_is_division_by_zero() {
    let result = price(&PriceRequest {
        purchase_price: dec("10"),
        ratio: dec("0"),
        multiplier: dec("1"),
        manual_price_override: None,
    });
    assert!(matches!(result, Err(AppError::DivisionByZero)));
}

#[test]
fn test_calculators_reject_values_out_of_range() {
    let result = price(&PriceRequest {
        purchase_price: dec("79228162514264337593543950"),
        ratio: dec("0.0001"),
        multiplier: dec("1"),
        manual_price_override: None,
    });
    assert!(matches!(result, Err(AppError::ValueOutOfRange)));

    let result = ratio(&RatioRequest {
        purchase_unit: "mg".to_string(),
        selling_unit: "ton".to_string(),
        selling_quantity: dec("79000000000000000000000000"),
    });
    assert!(matches!(result, Err(AppError::ValueOutOfRange)));
}

#[test]
fn test_discount_bounds() {
    let response = discount(&DiscountRequest {
        price: dec("200"),
        discount_percent: dec("12.5"),
    })
    .unwrap();
    assert_eq!(response.discounted_price, dec("175"));

    for percent in ["-1", "100.01"] {
        let result = discount(&DiscountRequest {
            price: dec("200"),
            discount_percent: dec(percent),
        });
        assert!(matches!(result, Err(AppError::Validation { .. })));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// A discount inside 0..=100 never raises the price or drops it below zero
    #[test]
    fn prop_discount_stays_within_price(cents in 0i64..10_000_000, percent in 0u32..=100) {
        let price_value = rust_decimal::Decimal::new(cents, 2);
        let response = discount(&DiscountRequest {
            price: price_value,
            discount_percent: rust_decimal::Decimal::from(percent),
        })
        .unwrap();
        prop_assert!(response.discounted_price <= price_value);
        prop_assert!(response.discounted_price >= rust_decimal::Decimal::ZERO);
    }

    /// Selling in the purchase unit itself gives a ratio equal to the quantity
    #[test]
    fn prop_same_unit_ratio_is_the_quantity(quantity in 1i64..1_000_000) {
        let quantity = rust_decimal::Decimal::from(quantity);
        let response = ratio(&RatioRequest {
            purchase_unit: "kg".to_string(),
            selling_unit: "kg".to_string(),
            selling_quantity: quantity,
        })
        .unwrap();
        prop_assert_eq!(response.ratio, quantity);
    }
}

// ============================================================================
// Product pricing edits
// ============================================================================

#[tokio::test]
async fn test_purchase_price_edit_recomputes_both_channels() {
    let app = test_app();
    let product = seed_product(&app, "7", "0").await;

    let outcome = app
        .state
        .pricing()
        .apply_edit(product.id, PricingEdit::PurchasePrice { value: dec("120") })
        .await
        .unwrap();

    assert!(outcome.issues.is_empty());
    // 250 g of a kg at 120 → 480 × 1.5
    assert_eq!(outcome.product.pricing.b2c.calculated_price, Some(dec("720")));
    assert_eq!(outcome.product.pricing.b2b.calculated_price, Some(dec("144")));
    assert_eq!(outcome.product.stock_quantity, dec("7"));
}

#[tokio::test]
async fn test_selling_unit_edit_only_touches_its_channel() {
    let app = test_app();
    let product = seed_product(&app, "0", "0").await;
    let b2b_before = product.pricing.b2b.clone();

    let outcome = app
        .state
        .pricing()
        .apply_edit(
            product.id,
            PricingEdit::SellingUnit {
                channel: Channel::B2c,
                quantity: dec("1"),
                unit: "l".to_string(),
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.issues.len(), 1);
    assert_eq!(outcome.issues[0].channel, Channel::B2c);
    assert_eq!(outcome.product.pricing.b2c.ratio, None);
    assert_eq!(outcome.product.pricing.b2c.calculated_price, None);
    assert_eq!(outcome.product.pricing.b2b, b2b_before);

    let view = app.state.pricing().get(product.id).await.unwrap();
    assert_eq!(view.pricing, outcome.product.pricing);
}

#[tokio::test]
async fn test_manual_override_shows_in_quotes() {
    let app = test_app();
    let product = seed_product(&app, "0", "0").await;

    let outcome = app
        .state
        .pricing()
        .apply_edit(
            product.id,
            PricingEdit::ManualOverride {
                channel: Channel::B2b,
                value: Some(dec("99.999")),
            },
        )
        .await
        .unwrap();

    let quote = outcome
        .pricing
        .quotes
        .iter()
        .find(|q| q.channel == Channel::B2b)
        .unwrap();
    assert_eq!(quote.displayed_price, Some(dec("100.00")));
    assert!(quote.has_override);

    let cleared = app
        .state
        .pricing()
        .apply_edit(
            product.id,
            PricingEdit::ManualOverride {
                channel: Channel::B2b,
                value: None,
            },
        )
        .await
        .unwrap();
    assert!(cleared.pricing.quotes.iter().all(|q| !q.has_override));
}

#[tokio::test]
async fn test_invalid_edit_is_not_persisted() {
    let app = test_app();
    let product = seed_product(&app, "0", "0").await;

    let result = app
        .state
        .pricing()
        .apply_edit(
            product.id,
            PricingEdit::Multiplier {
                channel: Channel::B2c,
                value: dec("-2"),
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Validation { .. })));

    let view = app.state.pricing().get(product.id).await.unwrap();
    assert_eq!(view.pricing, product.pricing);
}

#[tokio::test]
async fn test_edit_on_unknown_product_is_not_found() {
    let app = test_app();
    let result = app
        .state
        .pricing()
        .apply_edit(Uuid::new_v4(), PricingEdit::PurchasePrice { value: dec("1") })
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}
