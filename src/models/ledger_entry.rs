//! Ledger entry data model and credit-write request types.
//!
//! Every balance-affecting event is recorded as one immutable row in the
//! `wallet_transactions` table. Rows are never updated or deleted;
//! corrections are modeled as new entries (a `refund` entry reverses a
//! `spend`, never mutates it).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a ledger entry record from the database.
///
/// # Sign Convention
///
/// `earn`, `refund`, and credit `adjust` entries are positive;
/// `spend` and `expire` entries are negative.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct LedgerEntry {
    /// Unique identifier for this entry
    pub id: Uuid,

    /// Wallet this entry belongs to
    pub wallet_id: Uuid,

    /// Wallet type, denormalized from the wallet for query convenience
    pub wallet_type: String,

    /// One of: earn, spend, refund, expire, adjust
    pub entry_type: String,

    /// Signed amount in whole currency/point units
    pub amount: i64,

    /// What kind of thing `reference_id` points at (e.g., "order",
    /// "order_refund", "event")
    pub reference_type: Option<String>,

    /// Identifier of the originating order or event
    pub reference_id: Option<String>,

    /// Human-readable description shown in transaction history
    pub description: Option<String>,

    /// Set only on earn entries: when this credit lot expires
    pub expires_at: Option<DateTime<Utc>>,

    /// Who caused the entry: system, admin, or customer
    pub operator_type: String,

    /// When the entry was appended
    pub created_at: DateTime<Utc>,
}

/// The fields needed to append one ledger entry.
///
/// Used by the ledger store so every write path (earn, spend, refund,
/// adjust) records entries through the same INSERT.
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub wallet_id: Uuid,
    pub wallet_type: String,
    pub entry_type: &'static str,
    pub amount: i64,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub description: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub operator_type: &'static str,
}

/// Request to grant credit to a customer (the `earn` write path).
///
/// # JSON Example
///
/// ```json
/// {
///   "customer_id": "cus_123",
///   "wallet_type": "birthday",
///   "amount": 100,
///   "expires_at": "2026-12-31T15:59:59Z",
///   "description": "Birthday credit 2026"
/// }
/// ```
///
/// This is the only path that creates wallets: a missing
/// (customer, wallet_type) wallet is created lazily with balance 0 before
/// the earn entry is appended.
#[derive(Debug, Deserialize)]
pub struct EarnRequest {
    /// Customer receiving the credit
    pub customer_id: Option<String>,

    /// Which credit pool to grant into
    pub wallet_type: String,

    /// Amount to grant (must be positive)
    pub amount: i64,

    /// Optional expiry instant for this credit lot
    pub expires_at: Option<DateTime<Utc>>,

    /// Optional link to the originating event
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,

    /// Optional description shown in transaction history
    pub description: Option<String>,

    /// Who triggered the grant: system (default), admin, or customer
    pub operator_type: Option<String>,
}

/// Request for an admin balance correction (the `adjust` write path).
///
/// Amount is signed: positive adds credit, negative removes it. Negative
/// adjustments are rejected when they would drive the balance below zero.
/// Adjustments never create wallets.
#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    /// Customer whose wallet is being corrected
    pub customer_id: Option<String>,

    /// Which credit pool to adjust
    pub wallet_type: String,

    /// Signed, non-zero amount
    pub amount: i64,

    /// Optional link to the originating event
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,

    /// Optional description shown in transaction history
    pub description: Option<String>,
}

/// Response returned for earn and adjust operations.
#[derive(Debug, Serialize)]
pub struct EntryWriteResponse {
    /// The appended ledger entry's id
    pub entry_id: Uuid,

    pub wallet_type: String,
    pub entry_type: String,
    pub amount: i64,
    pub expires_at: Option<DateTime<Utc>>,

    /// Wallet balance after the write
    pub balance: i64,

    pub created_at: DateTime<Utc>,
}

impl EntryWriteResponse {
    /// Build the response from an appended entry and the post-write balance.
    pub fn from_entry(entry: LedgerEntry, balance: i64) -> Self {
        Self {
            entry_id: entry.id,
            wallet_type: entry.wallet_type,
            entry_type: entry.entry_type,
            amount: entry.amount,
            expires_at: entry.expires_at,
            balance,
            created_at: entry.created_at,
        }
    }
}
