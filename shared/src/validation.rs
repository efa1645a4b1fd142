//! Validation utilities for procurement inputs

use rust_decimal::Decimal;

use crate::models::{CollectionProduct, CollectionWindow};
use crate::pricing::{ProductPricing, SellingSide};
use crate::units::find_unit;

/// Maximum length of free-text notes
pub const MAX_NOTES_LENGTH: usize = 2000;

// ============================================================================
// Purchase Order Validations
// ============================================================================

/// Ordered quantity must be positive
pub fn validate_order_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be positive");
    }
    Ok(())
}

/// Unit price cannot be negative (zero is allowed for free samples)
pub fn validate_unit_price(unit_price: Decimal) -> Result<(), &'static str> {
    if unit_price < Decimal::ZERO {
        return Err("Unit price cannot be negative");
    }
    Ok(())
}

/// A unit code must be registered
pub fn validate_unit_code(code: &str) -> Result<(), &'static str> {
    if find_unit(code).is_none() {
        return Err("Unknown unit");
    }
    Ok(())
}

/// Rejection and cancellation reasons must be non-blank
pub fn validate_reason(reason: &str) -> Result<(), &'static str> {
    if reason.trim().is_empty() {
        return Err("A reason is required");
    }
    Ok(())
}

pub fn validate_notes(notes: Option<&str>) -> Result<(), &'static str> {
    match notes {
        Some(n) if n.chars().count() > MAX_NOTES_LENGTH => Err("Notes are too long"),
        _ => Ok(()),
    }
}

/// Collection window must not end before it starts
pub fn validate_collection_window(window: &CollectionWindow) -> Result<(), &'static str> {
    if window.end < window.start {
        return Err("Collection window ends before it starts");
    }
    Ok(())
}

/// Advance payments must be positive
pub fn validate_advance_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount <= Decimal::ZERO {
        return Err("Advance payment amount must be positive");
    }
    Ok(())
}

// ============================================================================
// Collection Validations
// ============================================================================

/// Verified quantity must be positive
pub fn validate_verified_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Verified quantity must be positive");
    }
    Ok(())
}

pub fn validate_collection_lines(lines: &[CollectionProduct]) -> Result<(), &'static str> {
    if lines.is_empty() {
        return Err("A collection needs at least one product line");
    }
    for line in lines {
        if line.expected_quantity <= Decimal::ZERO {
            return Err("Expected quantity must be positive");
        }
        if line.agreed_price_per_unit < Decimal::ZERO {
            return Err("Agreed price cannot be negative");
        }
        if line.product_id.is_none()
            && line.product_name.as_deref().map_or(true, |n| n.trim().is_empty())
        {
            return Err("A product line needs a product or a product name");
        }
    }
    Ok(())
}

// ============================================================================
// Pricing Validations
// ============================================================================

fn validate_selling_side(side: &SellingSide) -> Result<(), &'static str> {
    if side.quantity <= Decimal::ZERO {
        return Err("Selling quantity must be positive");
    }
    if side.multiplier < Decimal::ZERO {
        return Err("Multiplier cannot be negative");
    }
    if side.unit.trim().is_empty() {
        return Err("Selling unit is required");
    }
    if matches!(side.manual_price_override, Some(p) if p < Decimal::ZERO) {
        return Err("Price override cannot be negative");
    }
    Ok(())
}

/// Validate a pricing configuration supplied by a caller
///
/// Incompatible units are not a validation error: the affected channel is
/// stored without a ratio and reported as a pricing issue.
pub fn validate_pricing(pricing: &ProductPricing) -> Result<(), &'static str> {
    if pricing.purchase_unit.trim().is_empty() {
        return Err("Purchase unit is required");
    }
    if pricing.purchase_price < Decimal::ZERO {
        return Err("Purchase price cannot be negative");
    }
    validate_selling_side(&pricing.b2c)?;
    validate_selling_side(&pricing.b2b)?;
    Ok(())
}

/// Cash movements are positive; the kind gives the sign
pub fn validate_cash_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount <= Decimal::ZERO {
        return Err("Amount must be positive");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn line() -> CollectionProduct {
        CollectionProduct {
            po_id: None,
            product_id: None,
            product_name: Some("Arabica green beans".to_string()),
            expected_quantity: dec("20"),
            unit: "kg".to_string(),
            agreed_price_per_unit: dec("4.5"),
        }
    }

    #[test]
    fn test_validate_order_quantity() {
        assert!(validate_order_quantity(dec("0.5")).is_ok());
        assert!(validate_order_quantity(Decimal::ZERO).is_err());
        assert!(validate_order_quantity(dec("-1")).is_err());
    }

    #[test]
    fn test_validate_unit_price() {
        assert!(validate_unit_price(Decimal::ZERO).is_ok());
        assert!(validate_unit_price(dec("12.5")).is_ok());
        assert!(validate_unit_price(dec("-0.01")).is_err());
    }

    #[test]
    fn test_validate_unit_code() {
        assert!(validate_unit_code("kg").is_ok());
        assert!(validate_unit_code("Box").is_ok());
        assert!(validate_unit_code("parsec").is_err());
    }

    #[test]
    fn test_validate_reason() {
        assert!(validate_reason("Supplier out of stock").is_ok());
        assert!(validate_reason("   ").is_err());
        assert!(validate_reason("").is_err());
    }

    #[test]
    fn test_validate_notes_length() {
        assert!(validate_notes(None).is_ok());
        assert!(validate_notes(Some("short")).is_ok());
        let long = "x".repeat(MAX_NOTES_LENGTH + 1);
        assert!(validate_notes(Some(&long)).is_err());
    }

    #[test]
    fn test_validate_collection_window() {
        let now = Utc::now();
        let ok = CollectionWindow {
            start: now,
            end: now + Duration::hours(2),
        };
        let backwards = CollectionWindow {
            start: now,
            end: now - Duration::hours(2),
        };
        assert!(validate_collection_window(&ok).is_ok());
        assert!(validate_collection_window(&backwards).is_err());
    }

    #[test]
    fn test_validate_collection_lines() {
        assert!(validate_collection_lines(&[line()]).is_ok());
        assert!(validate_collection_lines(&[]).is_err());

        let mut nameless = line();
        nameless.product_name = Some("  ".to_string());
        assert!(validate_collection_lines(&[nameless]).is_err());

        let mut zero = line();
        zero.expected_quantity = Decimal::ZERO;
        assert!(validate_collection_lines(&[zero]).is_err());
    }

    #[test]
    fn test_validate_pricing() {
        let pricing = ProductPricing {
            purchase_unit: "kg".to_string(),
            purchase_price: dec("10"),
            b2c: SellingSide::new(dec("250"), "g", dec("1.5")),
            b2b: SellingSide::new(dec("1"), "box", dec("1.2")),
        };
        assert!(validate_pricing(&pricing).is_ok());

        let mut negative = pricing.clone();
        negative.purchase_price = dec("-1");
        assert!(validate_pricing(&negative).is_err());

        let mut zero_qty = pricing;
        zero_qty.b2b.quantity = Decimal::ZERO;
        assert!(validate_pricing(&zero_qty).is_err());
    }
}
