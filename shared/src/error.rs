//! Errors raised by the pure unit and pricing formulas

use thiserror::Error;

/// Formula errors are local decisions: the caller chooses whether to leave a
/// field blank or abort the edit. They are never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormulaError {
    #[error("Cannot convert between units '{from}' and '{to}'")]
    IncompatibleUnits { from: String, to: String },

    #[error("Ratio must be greater than zero")]
    DivisionByZero,

    #[error("Value is outside the representable range")]
    Overflow,
}

pub type FormulaResult<T> = Result<T, FormulaError>;

/// A stored or submitted enum value that does not name a known variant
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown {kind}: '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
