//! HTTP handlers

pub mod collection;
pub mod deliverer;
pub mod health;
pub mod pricing;
pub mod product;
pub mod purchase_order;

pub use collection::*;
pub use deliverer::*;
pub use health::*;
pub use pricing::*;
pub use product::*;
pub use purchase_order::*;
