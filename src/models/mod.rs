//! Data models representing database entities and API types.
//!
//! This module contains all data structures that map to database tables,
//! plus the request/response types for each endpoint.

/// API key authentication model
pub mod api_key;
/// Balance query request/response types
pub mod balance;
/// Ledger entry model and earn/adjust request types
pub mod ledger_entry;
/// Refund and spend request/response types
pub mod refund;
/// Wallet model and credit-pool display taxonomy
pub mod wallet;
