//! WebAssembly module for the pricing spreadsheet
//!
//! Provides client-side computation for:
//! - Selling ratios between purchase and selling units
//! - Calculated and displayed prices, override detection
//! - Discounts
//! - Applying a single cell edit to a product's pricing
//!
//! Decimals cross the boundary as strings so no precision is lost to f64.

use std::str::FromStr;

use js_sys::Array;
use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

pub use shared::pricing::*;
pub use shared::units::*;

fn parse_decimal(field: &str, value: &str) -> Result<Decimal, String> {
    Decimal::from_str(value.trim()).map_err(|_| format!("Invalid {}: '{}'", field, value))
}

fn parse_optional(field: &str, value: Option<String>) -> Result<Option<Decimal>, String> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => parse_decimal(field, v).map(Some),
    }
}

fn ratio_of(purchase_unit: &str, selling_unit: &str, selling_quantity: &str) -> Result<String, String> {
    let quantity = parse_decimal("selling quantity", selling_quantity)?;
    selling_ratio(purchase_unit, selling_unit, quantity)
        .map(|r| r.normalize().to_string())
        .map_err(|e| e.to_string())
}

fn price_of(purchase_price: &str, ratio: &str, multiplier: &str) -> Result<String, String> {
    let price = recompute_price(
        parse_decimal("purchase price", purchase_price)?,
        parse_decimal("ratio", ratio)?,
        parse_decimal("multiplier", multiplier)?,
    )
    .map_err(|e| e.to_string())?;
    Ok(price.to_string())
}

fn override_differs(calculated: Option<String>, manual_override: Option<String>) -> Result<bool, String> {
    Ok(has_override(
        parse_optional("calculated price", calculated)?,
        parse_optional("override", manual_override)?,
    ))
}

fn discount_of(price: &str, discount_percent: &str) -> Result<String, String> {
    let percent = parse_decimal("discount", discount_percent)?;
    if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
        return Err("Discount must be between 0 and 100 percent".to_string());
    }
    discounted_price(parse_decimal("price", price)?, percent)
        .map(|p| p.to_string())
        .map_err(|e| e.to_string())
}

fn edit_pricing(pricing_json: &str, edit_json: &str) -> Result<(String, Vec<PricingIssue>), String> {
    let mut pricing: ProductPricing =
        serde_json::from_str(pricing_json).map_err(|e| format!("Invalid pricing JSON: {}", e))?;
    let edit: PricingEdit =
        serde_json::from_str(edit_json).map_err(|e| format!("Invalid edit JSON: {}", e))?;

    let issues = pricing.apply_edit(&edit);
    let json = serde_json::to_string(&serde_json::json!({
        "pricing": pricing,
        "quotes": pricing.quotes(),
        "issues": issues,
    }))
    .map_err(|e| e.to_string())?;
    Ok((json, issues))
}

/// Purchase units contained in `selling_quantity` of `selling_unit`
#[wasm_bindgen]
pub fn calculate_selling_ratio(
    purchase_unit: &str,
    selling_unit: &str,
    selling_quantity: &str,
) -> Result<String, JsValue> {
    ratio_of(purchase_unit, selling_unit, selling_quantity).map_err(|e| JsValue::from_str(&e))
}

/// (purchase price / ratio) × multiplier, rounded to 2 decimals
#[wasm_bindgen]
pub fn calculate_selling_price(purchase_price: &str, ratio: &str, multiplier: &str) -> Result<String, JsValue> {
    price_of(purchase_price, ratio, multiplier).map_err(|e| JsValue::from_str(&e))
}

/// The override when present, otherwise the calculated price
#[wasm_bindgen]
pub fn calculate_displayed_price(calculated: Option<String>, manual_override: Option<String>) -> Option<String> {
    manual_override
        .filter(|v| !v.trim().is_empty())
        .or(calculated)
}

#[wasm_bindgen]
pub fn price_has_override(calculated: Option<String>, manual_override: Option<String>) -> Result<bool, JsValue> {
    override_differs(calculated, manual_override).map_err(|e| JsValue::from_str(&e))
}

#[wasm_bindgen]
pub fn calculate_discounted_price(price: &str, discount_percent: &str) -> Result<String, JsValue> {
    discount_of(price, discount_percent).map_err(|e| JsValue::from_str(&e))
}

#[wasm_bindgen]
pub fn units_convertible(from: &str, to: &str) -> bool {
    can_convert(from, to)
}

/// Unit codes, in table order
#[wasm_bindgen]
pub fn list_unit_codes() -> Array {
    all_units().iter().map(|u| JsValue::from_str(u.code)).collect()
}

/// Apply one cell edit to a pricing JSON document; returns pricing, quotes and issues
#[wasm_bindgen]
pub fn apply_pricing_edit(pricing_json: &str, edit_json: &str) -> Result<String, JsValue> {
    let (json, issues) = edit_pricing(pricing_json, edit_json).map_err(|e| JsValue::from_str(&e))?;
    for issue in &issues {
        web_sys::console::warn_1(&JsValue::from_str(&format!(
            "{} price not computed: {}",
            issue.channel, issue.message
        )));
    }
    Ok(json)
}
