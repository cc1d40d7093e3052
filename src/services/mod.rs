//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They handle database transactions, validation, and complex operations.

/// Balance aggregation (the read side)
pub mod balance_service;
/// Ledger store primitives plus the earn/adjust write paths
pub mod ledger_service;
/// Proportional refund allocation
pub mod refund_service;
/// Checkout deduction (the spend write path)
pub mod spend_service;
