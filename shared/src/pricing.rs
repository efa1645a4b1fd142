//! Selling price formulas
//!
//! Calculated price = (purchase price / ratio) × multiplier, where the ratio is
//! the purchase-unit equivalent of one selling unit. B2C and B2B sides are
//! computed independently.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{FormulaError, FormulaResult};
use crate::units::selling_ratio;

/// Decimal places for monetary values
pub const MONEY_DECIMAL_PLACES: u32 = 2;

/// Precision at which an override is compared with the calculated price
pub const OVERRIDE_COMPARISON_DECIMAL_PLACES: u32 = 2;

/// Round a monetary value (2 decimal places, half away from zero)
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// (purchase_price / ratio) × multiplier, unrounded
pub fn calculated_price(purchase_price: Decimal, ratio: Decimal, multiplier: Decimal) -> FormulaResult<Decimal> {
    if ratio <= Decimal::ZERO {
        return Err(FormulaError::DivisionByZero);
    }
    purchase_price
        .checked_div(ratio)
        .and_then(|per_unit| per_unit.checked_mul(multiplier))
        .ok_or(FormulaError::Overflow)
}

/// The price shown to customers: override when present, else calculated
pub fn displayed_price(calculated: Option<Decimal>, manual_override: Option<Decimal>) -> Option<Decimal> {
    manual_override.or(calculated)
}

/// Whether a manual override differs from the calculated price
///
/// Both sides are rounded to [`OVERRIDE_COMPARISON_DECIMAL_PLACES`] first.
pub fn has_override(calculated: Option<Decimal>, manual_override: Option<Decimal>) -> bool {
    let round = |v: Decimal| {
        v.round_dp_with_strategy(
            OVERRIDE_COMPARISON_DECIMAL_PLACES,
            RoundingStrategy::MidpointAwayFromZero,
        )
    };
    match (manual_override, calculated) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(o), Some(c)) => round(o) != round(c),
    }
}

/// Apply a percentage discount, rounded to 2 decimals
pub fn discounted_price(price: Decimal, discount_percent: Decimal) -> FormulaResult<Decimal> {
    if discount_percent <= Decimal::ZERO {
        return Ok(round_money(price));
    }
    (Decimal::ONE - discount_percent / Decimal::ONE_HUNDRED)
        .checked_mul(price)
        .map(round_money)
        .ok_or(FormulaError::Overflow)
}

/// Ratio for a selling unit against the purchase unit
pub fn recompute_ratio(purchase_unit: &str, selling_unit: &str, selling_quantity: Decimal) -> FormulaResult<Decimal> {
    selling_ratio(purchase_unit, selling_unit, selling_quantity)
}

/// Calculated selling price, rounded to 2 decimals
pub fn recompute_price(purchase_price: Decimal, ratio: Decimal, multiplier: Decimal) -> FormulaResult<Decimal> {
    calculated_price(purchase_price, ratio, multiplier).map(round_money)
}

/// Sales channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    B2c,
    B2b,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::B2c => "b2c",
            Channel::B2b => "b2b",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selling configuration of one channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellingSide {
    pub quantity: Decimal,
    pub unit: String,
    pub multiplier: Decimal,
    /// Derived: purchase units per selling unit
    #[serde(default)]
    pub ratio: Option<Decimal>,
    /// Derived: (purchase price / ratio) × multiplier
    #[serde(default)]
    pub calculated_price: Option<Decimal>,
    #[serde(default)]
    pub manual_price_override: Option<Decimal>,
}

impl SellingSide {
    pub fn new(quantity: Decimal, unit: impl Into<String>, multiplier: Decimal) -> Self {
        Self {
            quantity,
            unit: unit.into(),
            multiplier,
            ratio: None,
            calculated_price: None,
            manual_price_override: None,
        }
    }

    /// Re-derive ratio and calculated price. On error both are left unset.
    pub fn recompute(&mut self, purchase_unit: &str, purchase_price: Decimal) -> FormulaResult<()> {
        self.ratio = None;
        self.calculated_price = None;

        let ratio = recompute_ratio(purchase_unit, &self.unit, self.quantity)?;
        let price = recompute_price(purchase_price, ratio, self.multiplier)?;
        self.ratio = Some(ratio);
        self.calculated_price = Some(price);
        Ok(())
    }

    pub fn displayed_price(&self) -> Option<Decimal> {
        displayed_price(self.calculated_price, self.manual_price_override)
    }

    pub fn has_override(&self) -> bool {
        has_override(self.calculated_price, self.manual_price_override)
    }

    pub fn quote(&self, channel: Channel) -> PriceQuote {
        PriceQuote {
            channel,
            ratio: self.ratio,
            calculated_price: self.calculated_price,
            displayed_price: self.displayed_price(),
            has_override: self.has_override(),
        }
    }
}

/// A formula problem found while recomputing a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingIssue {
    pub channel: Channel,
    pub message: String,
}

/// Complete pricing configuration of a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPricing {
    pub purchase_unit: String,
    pub purchase_price: Decimal,
    pub b2c: SellingSide,
    pub b2b: SellingSide,
}

impl ProductPricing {
    pub fn side(&self, channel: Channel) -> &SellingSide {
        match channel {
            Channel::B2c => &self.b2c,
            Channel::B2b => &self.b2b,
        }
    }

    pub fn side_mut(&mut self, channel: Channel) -> &mut SellingSide {
        match channel {
            Channel::B2c => &mut self.b2c,
            Channel::B2b => &mut self.b2b,
        }
    }

    /// Recompute one channel, reporting a formula problem as an issue
    pub fn recompute_channel(&mut self, channel: Channel) -> Option<PricingIssue> {
        let purchase_unit = self.purchase_unit.clone();
        let purchase_price = self.purchase_price;
        self.side_mut(channel)
            .recompute(&purchase_unit, purchase_price)
            .err()
            .map(|e| PricingIssue {
                channel,
                message: e.to_string(),
            })
    }

    /// Recompute both channels independently
    pub fn recompute(&mut self) -> Vec<PricingIssue> {
        [Channel::B2c, Channel::B2b]
            .into_iter()
            .filter_map(|channel| self.recompute_channel(channel))
            .collect()
    }

    /// Apply an edit and recompute the channels it affects
    pub fn apply_edit(&mut self, edit: &PricingEdit) -> Vec<PricingIssue> {
        match edit {
            PricingEdit::PurchasePrice { value } => {
                self.purchase_price = *value;
                self.recompute()
            }
            PricingEdit::PurchaseUnit { unit } => {
                self.purchase_unit = unit.clone();
                self.recompute()
            }
            PricingEdit::SellingUnit {
                channel,
                quantity,
                unit,
            } => {
                let side = self.side_mut(*channel);
                side.quantity = *quantity;
                side.unit = unit.clone();
                self.recompute_channel(*channel).into_iter().collect()
            }
            PricingEdit::Multiplier { channel, value } => {
                self.side_mut(*channel).multiplier = *value;
                self.recompute_channel(*channel).into_iter().collect()
            }
            PricingEdit::ManualOverride { channel, value } => {
                self.side_mut(*channel).manual_price_override = value.map(round_money);
                Vec::new()
            }
        }
    }

    pub fn quotes(&self) -> Vec<PriceQuote> {
        vec![self.b2c.quote(Channel::B2c), self.b2b.quote(Channel::B2b)]
    }
}

/// A single pricing-cell edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", rename_all = "snake_case")]
pub enum PricingEdit {
    PurchasePrice { value: Decimal },
    PurchaseUnit { unit: String },
    SellingUnit { channel: Channel, quantity: Decimal, unit: String },
    Multiplier { channel: Channel, value: Decimal },
    ManualOverride { channel: Channel, value: Option<Decimal> },
}

/// Read model of one channel's price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub channel: Channel,
    pub ratio: Option<Decimal>,
    pub calculated_price: Option<Decimal>,
    pub displayed_price: Option<Decimal>,
    pub has_override: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn coffee_pricing() -> ProductPricing {
        ProductPricing {
            purchase_unit: "kg".to_string(),
            purchase_price: dec("10"),
            b2c: SellingSide::new(dec("250"), "g", dec("1.5")),
            b2b: SellingSide::new(dec("1"), "kg", dec("1.2")),
        }
    }

    #[test]
    fn test_calculated_price() {
        assert_eq!(calculated_price(dec("10"), dec("4"), dec("1.5")).unwrap(), dec("3.75"));
    }

    #[test]
    fn test_calculated_price_zero_ratio() {
        assert_eq!(
            calculated_price(dec("10"), Decimal::ZERO, dec("1.5")),
            Err(FormulaError::DivisionByZero)
        );
        assert_eq!(
            calculated_price(dec("10"), dec("-1"), dec("1.5")),
            Err(FormulaError::DivisionByZero)
        );
    }

    #[test]
    fn test_displayed_price() {
        assert_eq!(displayed_price(Some(dec("3.75")), None), Some(dec("3.75")));
        assert_eq!(displayed_price(Some(dec("3.75")), Some(dec("4"))), Some(dec("4")));
        assert_eq!(displayed_price(None, Some(dec("4"))), Some(dec("4")));
        assert_eq!(displayed_price(None, None), None);
    }

    #[test]
    fn test_has_override() {
        assert!(!has_override(Some(dec("3.75")), None));
        assert!(has_override(Some(dec("3.75")), Some(dec("4.00"))));
        assert!(has_override(None, Some(dec("4.00"))));
        assert!(!has_override(Some(dec("3.75")), Some(dec("3.75"))));
    }

    #[test]
    fn test_has_override_ignores_float_noise() {
        assert!(!has_override(Some(dec("3.75")), Some(dec("3.7500000001"))));
        assert!(!has_override(Some(dec("3.7499999999")), Some(dec("3.75"))));
    }

    #[test]
    fn test_discounted_price() {
        assert_eq!(discounted_price(dec("100"), dec("10")).unwrap(), dec("90.00"));
        assert_eq!(discounted_price(dec("19.99"), dec("15")).unwrap(), dec("16.99"));
        assert_eq!(discounted_price(dec("19.99"), Decimal::ZERO).unwrap(), dec("19.99"));
        assert_eq!(discounted_price(dec("19.99"), dec("-5")).unwrap(), dec("19.99"));
        assert_eq!(discounted_price(Decimal::MAX, dec("-200")).unwrap(), round_money(Decimal::MAX));
        assert_eq!(discounted_price(Decimal::MAX, dec("300")), Err(FormulaError::Overflow));
    }

    #[test]
    fn test_recompute_sides() {
        let mut pricing = coffee_pricing();
        let issues = pricing.recompute();
        assert!(issues.is_empty());
        // 250 g = 0.25 kg; 10 / 0.25 * 1.5 = 60
        assert_eq!(pricing.b2c.ratio, Some(dec("0.25")));
        assert_eq!(pricing.b2c.calculated_price, Some(dec("60.00")));
        assert_eq!(pricing.b2b.ratio, Some(dec("1")));
        assert_eq!(pricing.b2b.calculated_price, Some(dec("12.00")));
    }

    #[test]
    fn test_incompatible_side_left_unset() {
        let mut pricing = coffee_pricing();
        pricing.b2b = SellingSide::new(dec("1"), "box", dec("1.2"));
        let issues = pricing.recompute();

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].channel, Channel::B2b);
        assert_eq!(pricing.b2b.ratio, None);
        assert_eq!(pricing.b2b.calculated_price, None);
        assert_eq!(pricing.b2c.calculated_price, Some(dec("60.00")));
    }

    #[test]
    fn test_zero_quantity_side_has_no_price() {
        let mut pricing = coffee_pricing();
        pricing.b2c.quantity = Decimal::ZERO;
        let issues = pricing.recompute();

        assert_eq!(issues.len(), 1);
        assert_eq!(pricing.b2c.ratio, None);
        assert_eq!(pricing.b2c.calculated_price, None);
    }

    #[test]
    fn test_quantity_too_small_for_purchase_unit_has_no_ratio() {
        let mut pricing = coffee_pricing();
        pricing.purchase_unit = "ton".to_string();
        pricing.b2c = SellingSide::new(dec("0.0000000000000000000000001"), "mg", dec("1"));
        let issues = pricing.recompute();

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].channel, Channel::B2c);
        assert_eq!(pricing.b2c.ratio, None);
        assert_eq!(pricing.b2c.calculated_price, None);
        assert!(pricing.b2b.ratio.is_some());
    }

    #[test]
    fn test_failed_recompute_clears_previous_values() {
        let mut pricing = coffee_pricing();
        pricing.recompute();
        assert!(pricing.b2c.ratio.is_some());

        let issues = pricing.apply_edit(&PricingEdit::SellingUnit {
            channel: Channel::B2c,
            quantity: Decimal::ZERO,
            unit: "g".to_string(),
        });

        assert_eq!(issues.len(), 1);
        assert_eq!(pricing.b2c.ratio, None);
        assert_eq!(pricing.b2c.calculated_price, None);
    }

    #[test]
    fn test_calculated_price_overflow() {
        assert_eq!(
            calculated_price(Decimal::MAX, dec("0.0001"), Decimal::ONE),
            Err(FormulaError::Overflow)
        );
        assert_eq!(
            calculated_price(Decimal::MAX, Decimal::ONE, dec("2")),
            Err(FormulaError::Overflow)
        );
    }

    #[test]
    fn test_overflowing_side_reports_issue() {
        let mut pricing = coffee_pricing();
        pricing.purchase_price = Decimal::MAX;
        let issues = pricing.recompute();

        // 250 g is a ratio of 0.25 and MAX / 0.25 does not fit
        assert!(issues.iter().any(|i| i.channel == Channel::B2c));
        assert_eq!(pricing.b2c.ratio, None);
        assert_eq!(pricing.b2c.calculated_price, None);
    }

    #[test]
    fn test_edit_multiplier_only_touches_its_channel() {
        let mut pricing = coffee_pricing();
        pricing.recompute();
        let b2b_before = pricing.b2b.clone();

        let issues = pricing.apply_edit(&PricingEdit::Multiplier {
            channel: Channel::B2c,
            value: dec("2"),
        });

        assert!(issues.is_empty());
        assert_eq!(pricing.b2c.calculated_price, Some(dec("80.00")));
        assert_eq!(pricing.b2b, b2b_before);
    }

    #[test]
    fn test_edit_purchase_price_recomputes_both() {
        let mut pricing = coffee_pricing();
        pricing.recompute();
        pricing.apply_edit(&PricingEdit::PurchasePrice { value: dec("20") });

        assert_eq!(pricing.b2c.calculated_price, Some(dec("120.00")));
        assert_eq!(pricing.b2b.calculated_price, Some(dec("24.00")));
    }

    #[test]
    fn test_edit_purchase_unit_to_incompatible() {
        let mut pricing = coffee_pricing();
        pricing.recompute();
        let issues = pricing.apply_edit(&PricingEdit::PurchaseUnit { unit: "l".to_string() });

        assert_eq!(issues.len(), 2);
        assert_eq!(pricing.b2c.calculated_price, None);
        assert_eq!(pricing.b2b.calculated_price, None);
    }

    #[test]
    fn test_manual_override_quote() {
        let mut pricing = coffee_pricing();
        pricing.recompute();
        pricing.apply_edit(&PricingEdit::ManualOverride {
            channel: Channel::B2c,
            value: Some(dec("59.99")),
        });

        let quote = pricing.b2c.quote(Channel::B2c);
        assert_eq!(quote.displayed_price, Some(dec("59.99")));
        assert!(quote.has_override);

        pricing.apply_edit(&PricingEdit::ManualOverride {
            channel: Channel::B2c,
            value: None,
        });
        assert_eq!(pricing.b2c.displayed_price(), Some(dec("60.00")));
        assert!(!pricing.b2c.has_override());
    }

    #[test]
    fn test_pricing_edit_json_shape() {
        let edit: PricingEdit = serde_json::from_str(
            r#"{"field":"selling_unit","channel":"b2c","quantity":"500","unit":"g"}"#,
        )
        .unwrap();
        assert_eq!(
            edit,
            PricingEdit::SellingUnit {
                channel: Channel::B2c,
                quantity: dec("500"),
                unit: "g".to_string()
            }
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Calculated price scales linearly with the multiplier
        #[test]
        fn prop_price_linear_in_multiplier(
            price_cents in 1i64..10_000_000,
            ratio_milli in 1i64..100_000,
            mult_tenths in 1i64..100,
        ) {
            let price = Decimal::new(price_cents, 2);
            let ratio = Decimal::new(ratio_milli, 3);
            let base = calculated_price(price, ratio, Decimal::ONE).unwrap();
            let scaled = calculated_price(price, ratio, Decimal::new(mult_tenths, 1)).unwrap();
            let diff = (scaled - base * Decimal::new(mult_tenths, 1)).abs();
            prop_assert!(diff < dec("0.0000001"));
        }

        /// Discounts never increase the price
        #[test]
        fn prop_discount_never_increases(
            price_cents in 0i64..10_000_000,
            percent in 0i64..=100,
        ) {
            let price = Decimal::new(price_cents, 2);
            let discounted = discounted_price(price, Decimal::from(percent)).unwrap();
            prop_assert!(discounted <= price);
            prop_assert!(discounted >= Decimal::ZERO);
        }

        /// An override equal to the calculated price at 2 dp is not an override
        #[test]
        fn prop_override_noise_is_not_an_override(
            price_cents in 0i64..10_000_000,
            noise in 0i64..400,
        ) {
            let calculated = Decimal::new(price_cents, 2);
            // noise below half a cent
            let noisy = calculated + Decimal::new(noise, 5);
            prop_assert!(!has_override(Some(calculated), Some(noisy)));
        }
    }
}
