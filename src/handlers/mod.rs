//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Delegates to the matching service
//! 3. Returns HTTP response (JSON, status code)

/// Balance query endpoint
pub mod balance;
/// Earn and adjust endpoints
pub mod entries;
/// Health check endpoint
pub mod health;
/// Refund endpoint
pub mod refund;
/// Spend endpoint
pub mod spend;
