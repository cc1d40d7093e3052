//! Wallet data model and credit-pool display taxonomy.
//!
//! A wallet is one named credit pool (shopping credit, birthday credit,
//! loyalty points) for one customer within one merchant scope. Its cached
//! `balance` is a materialized aggregate of the wallet's ledger entries,
//! never independent state.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Represents a wallet record from the database.
///
/// # Database Table
///
/// Maps to the `wallets` table. One row exists per
/// (customer_id, merchant_code, wallet_type); wallets are created lazily on
/// the first credit event and never deleted.
///
/// # Invariant
///
/// `balance` equals the sum of all ledger entry amounts ever written for
/// this wallet. It is only mutated through single-statement atomic updates
/// (`balance = balance + delta`) committed together with the entry append.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Wallet {
    /// Unique identifier for this wallet
    pub id: Uuid,

    /// Customer who owns this credit pool
    pub customer_id: String,

    /// Tenant scope; every query filters on this
    pub merchant_code: String,

    /// Which credit pool this is (see [`WalletType`])
    pub wallet_type: String,

    /// Cached balance in whole currency/point units (never floats!)
    pub balance: i64,

    /// When the wallet was lazily created
    pub created_at: DateTime<Utc>,

    /// Last balance mutation
    pub updated_at: DateTime<Utc>,
}

/// Tenant-level deduction configuration, read (not owned) by the ledger.
///
/// `max_bps` is the maximum share of the order subtotal that credits may
/// cover, in basis points (1000 = 10%). Integer basis points keep
/// `floor(subtotal * pct)` exact: `subtotal * max_bps / 10_000` with
/// integer division.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct DeductionRule {
    pub min_order: i64,
    pub max_bps: i32,
}

impl DeductionRule {
    /// The configured maximum coverage as a fraction, for API responses.
    pub fn max_pct(&self) -> f64 {
        f64::from(self.max_bps) / 10_000.0
    }
}

/// The known credit pools, in display-priority order.
///
/// The storefront renders wallet breakdowns in a fixed order regardless of
/// balance: shopping credit first, then birthday credit, then loyalty
/// points. Types outside this list (future pools) sort after the known
/// ones, alphabetically by raw name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletType {
    ShoppingCredit,
    Birthday,
    Points,
}

impl WalletType {
    /// All known wallet types in display-priority order.
    pub const ALL: [WalletType; 3] = [
        WalletType::ShoppingCredit,
        WalletType::Birthday,
        WalletType::Points,
    ];

    /// The persisted identifier for this wallet type.
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletType::ShoppingCredit => "shopping_credit",
            WalletType::Birthday => "birthday",
            WalletType::Points => "points",
        }
    }

    /// Parse a persisted identifier; unknown types return None.
    pub fn parse(raw: &str) -> Option<WalletType> {
        WalletType::ALL.iter().copied().find(|t| t.as_str() == raw)
    }

    /// Human-readable name shown to the customer.
    pub fn display_name(&self) -> &'static str {
        match self {
            WalletType::ShoppingCredit => "Shopping Credit",
            WalletType::Birthday => "Birthday Credit",
            WalletType::Points => "Loyalty Points",
        }
    }

    /// Icon identifier the storefront maps to an asset.
    pub fn icon(&self) -> &'static str {
        match self {
            WalletType::ShoppingCredit => "wallet",
            WalletType::Birthday => "cake",
            WalletType::Points => "star",
        }
    }
}

/// Display-priority rank for a raw wallet type string.
///
/// Known types rank by their position in [`WalletType::ALL`]; unknown types
/// all rank last and tie-break alphabetically at the call site.
pub fn display_priority(raw: &str) -> usize {
    WalletType::ALL
        .iter()
        .position(|t| t.as_str() == raw)
        .unwrap_or(usize::MAX)
}

/// Human-readable name for a raw wallet type string.
///
/// Unknown types fall back to the raw identifier so future pools still
/// render something sensible.
pub fn display_name(raw: &str) -> String {
    match WalletType::parse(raw) {
        Some(t) => t.display_name().to_string(),
        None => raw.to_string(),
    }
}

/// Icon identifier for a raw wallet type string.
pub fn icon(raw: &str) -> &'static str {
    match WalletType::parse(raw) {
        Some(t) => t.icon(),
        None => "credit",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_types_round_trip() {
        for t in WalletType::ALL {
            assert_eq!(WalletType::parse(t.as_str()), Some(t));
        }
        assert_eq!(WalletType::parse("mystery_credit"), None);
    }

    #[test]
    fn display_priority_orders_known_types_first() {
        assert_eq!(display_priority("shopping_credit"), 0);
        assert_eq!(display_priority("birthday"), 1);
        assert_eq!(display_priority("points"), 2);
        assert_eq!(display_priority("mystery_credit"), usize::MAX);
    }

    #[test]
    fn unknown_types_fall_back_to_raw_name() {
        assert_eq!(display_name("mystery_credit"), "mystery_credit");
        assert_eq!(icon("mystery_credit"), "credit");
        assert_eq!(display_name("birthday"), "Birthday Credit");
    }
}
