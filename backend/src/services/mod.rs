//! Business logic services for the supplier procurement platform

pub mod batch_approval;
pub mod collection;
pub mod deliverer_cash;
pub mod pricing;
pub mod purchase_order;
pub mod stock_ledger;

pub use batch_approval::BatchApprovalCoordinator;
pub use collection::CollectionVerificationService;
pub use deliverer_cash::DelivererCashService;
pub use pricing::ProductPricingService;
pub use purchase_order::PurchaseOrderService;
pub use stock_ledger::ProductStockLedger;
