//! Shared types and models for the supplier procurement platform
//!
//! This crate contains the pure domain rules (unit conversion, pricing
//! formulas, purchase order and collection state tables) shared between the
//! backend, the browser spreadsheet (via WASM), and other components.

pub mod error;
pub mod models;
pub mod pricing;
pub mod types;
pub mod units;
pub mod validation;

pub use error::*;
pub use models::*;
pub use pricing::*;
pub use types::*;
pub use units::*;
pub use validation::*;
