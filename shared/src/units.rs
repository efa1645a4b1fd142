//! Measurement unit registry and conversions
//!
//! Units are grouped by category. Within a category every unit carries a
//! factor that converts a quantity of that unit into the category's base
//! unit by multiplication. Container units (box, sack, ...) are atomic and
//! never convertible, not even to themselves.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{FormulaError, FormulaResult};

/// Unit categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitCategory {
    Weight,
    Volume,
    Quantity,
    Container,
}

impl UnitCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitCategory::Weight => "weight",
            UnitCategory::Volume => "volume",
            UnitCategory::Quantity => "quantity",
            UnitCategory::Container => "container",
        }
    }

    /// Code of the base unit, `None` for containers
    pub fn base_unit(&self) -> Option<&'static str> {
        match self {
            UnitCategory::Weight => Some("g"),
            UnitCategory::Volume => Some("ml"),
            UnitCategory::Quantity => Some("pcs"),
            UnitCategory::Container => None,
        }
    }

    pub fn is_convertible(&self) -> bool {
        !matches!(self, UnitCategory::Container)
    }
}

impl std::fmt::Display for UnitCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered measurement unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unit {
    pub code: &'static str,
    pub label: &'static str,
    pub category: UnitCategory,
    /// Base factor as (mantissa, scale)
    factor: (i64, u32),
}

impl Unit {
    const fn new(code: &'static str, label: &'static str, category: UnitCategory, factor: (i64, u32)) -> Self {
        Self {
            code,
            label,
            category,
            factor,
        }
    }

    /// Multiplier converting one of this unit into the category base unit
    pub fn base_factor(&self) -> Decimal {
        Decimal::new(self.factor.0, self.factor.1)
    }
}

/// Serializable view of a unit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnitInfo {
    pub code: String,
    pub label: String,
    pub category: UnitCategory,
    pub base_factor: Decimal,
}

impl From<&Unit> for UnitInfo {
    fn from(unit: &Unit) -> Self {
        UnitInfo {
            code: unit.code.to_string(),
            label: unit.label.to_string(),
            category: unit.category,
            base_factor: unit.base_factor(),
        }
    }
}

static UNITS: &[Unit] = &[
    // Weight (base: gram)
    Unit::new("mg", "Milligram", UnitCategory::Weight, (1, 3)),
    Unit::new("g", "Gram", UnitCategory::Weight, (1, 0)),
    Unit::new("kg", "Kilogram", UnitCategory::Weight, (1000, 0)),
    Unit::new("ton", "Metric ton", UnitCategory::Weight, (1_000_000, 0)),
    Unit::new("oz", "Ounce", UnitCategory::Weight, (28_349_523_125, 9)),
    Unit::new("lb", "Pound", UnitCategory::Weight, (45_359_237, 5)),
    // Volume (base: millilitre)
    Unit::new("ml", "Millilitre", UnitCategory::Volume, (1, 0)),
    Unit::new("cl", "Centilitre", UnitCategory::Volume, (10, 0)),
    Unit::new("dl", "Decilitre", UnitCategory::Volume, (100, 0)),
    Unit::new("l", "Litre", UnitCategory::Volume, (1000, 0)),
    // Quantity (base: piece)
    Unit::new("pcs", "Piece", UnitCategory::Quantity, (1, 0)),
    Unit::new("pair", "Pair", UnitCategory::Quantity, (2, 0)),
    Unit::new("dozen", "Dozen", UnitCategory::Quantity, (12, 0)),
    Unit::new("gross", "Gross", UnitCategory::Quantity, (144, 0)),
    // Containers
    Unit::new("box", "Box", UnitCategory::Container, (1, 0)),
    Unit::new("pack", "Pack", UnitCategory::Container, (1, 0)),
    Unit::new("crate", "Crate", UnitCategory::Container, (1, 0)),
    Unit::new("bag", "Bag", UnitCategory::Container, (1, 0)),
    Unit::new("sack", "Sack", UnitCategory::Container, (1, 0)),
    Unit::new("bottle", "Bottle", UnitCategory::Container, (1, 0)),
    Unit::new("tray", "Tray", UnitCategory::Container, (1, 0)),
];

/// All registered units
pub fn all_units() -> &'static [Unit] {
    UNITS
}

/// Units belonging to a category
pub fn units_in(category: UnitCategory) -> impl Iterator<Item = &'static Unit> {
    UNITS.iter().filter(move |u| u.category == category)
}

/// Look up a unit by code (case-insensitive, surrounding whitespace ignored)
pub fn find_unit(code: &str) -> Option<&'static Unit> {
    let code = code.trim();
    UNITS.iter().find(|u| u.code.eq_ignore_ascii_case(code))
}

/// Category of a unit code, `None` if the code is unknown
pub fn unit_category(code: &str) -> Option<UnitCategory> {
    find_unit(code).map(|u| u.category)
}

/// Resolve both units if they share a convertible category
fn convertible_pair(from: &str, to: &str) -> Option<(&'static Unit, &'static Unit)> {
    let from_unit = find_unit(from)?;
    let to_unit = find_unit(to)?;
    (from_unit.category == to_unit.category && from_unit.category.is_convertible())
        .then_some((from_unit, to_unit))
}

/// True iff both units resolve to the same non-container category
pub fn can_convert(from: &str, to: &str) -> bool {
    convertible_pair(from, to).is_some()
}

/// Convert `value` expressed in `from` into `to`
pub fn convert(value: Decimal, from: &str, to: &str) -> FormulaResult<Decimal> {
    let (from_unit, to_unit) =
        convertible_pair(from, to).ok_or_else(|| FormulaError::IncompatibleUnits {
            from: from.to_string(),
            to: to.to_string(),
        })?;

    value
        .checked_mul(from_unit.base_factor())
        .and_then(|base| base.checked_div(to_unit.base_factor()))
        .ok_or(FormulaError::Overflow)
}

/// Purchase-unit equivalent of one selling unit (the pricing denominator)
///
/// 250 g sold out of stock bought per kg gives a ratio of 0.25.
pub fn selling_ratio(
    purchase_unit: &str,
    selling_unit: &str,
    selling_quantity: Decimal,
) -> FormulaResult<Decimal> {
    convert(selling_quantity, selling_unit, purchase_unit)
}
