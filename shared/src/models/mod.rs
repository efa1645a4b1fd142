//! Domain models for the supplier procurement platform

mod collection;
mod deliverer;
mod product;
mod purchase_order;
mod stock;
mod supplier;

pub use collection::*;
pub use deliverer::*;
pub use product::*;
pub use purchase_order::*;
pub use stock::*;
pub use supplier::*;
