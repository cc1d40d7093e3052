//! Balance query request/response types.
//!
//! The balance endpoint serves two views: `checkout` (deduction allowance
//! for an order being placed) and `detail` (the customer-facing credit
//! overview with expiring lots and recent transactions).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Query parameters for `GET /api/v1/credits/balance`.
///
/// `customer_id` is required (validated in the handler so its absence maps
/// to `MISSING_CUSTOMER_ID` rather than a generic extractor rejection).
#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    pub customer_id: Option<String>,

    /// Order subtotal the checkout wants to deduct against; omitted for
    /// plain balance displays
    pub order_subtotal: Option<i64>,

    /// "checkout" (default) or "detail"
    pub view: Option<String>,
}

/// Which balance view the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceView {
    Checkout,
    Detail,
}

impl BalanceView {
    /// Parse the `view` query parameter; anything but "detail" gets the
    /// default checkout view.
    pub fn parse(raw: Option<&str>) -> BalanceView {
        match raw {
            Some("detail") => BalanceView::Detail,
            _ => BalanceView::Checkout,
        }
    }
}

/// The single nearest-expiring credit lot across all of the customer's
/// wallets, or absent when nothing expires in the future.
#[derive(Debug, Clone, Serialize)]
pub struct NearestExpiry {
    /// Amount of the expiring earn lot
    pub amount: i64,

    /// When it expires
    pub date: DateTime<Utc>,
}

/// One row of the per-wallet-type breakdown.
///
/// Every known wallet type appears, in fixed display-priority order, even
/// at balance 0 - the storefront renders the full list regardless.
#[derive(Debug, Clone, Serialize)]
pub struct WalletBreakdown {
    pub wallet_type: String,
    pub display_name: String,
    pub icon: &'static str,
    pub balance: i64,
}

/// An earn lot that has not yet expired, surfaced in the detail view.
#[derive(Debug, Clone, Serialize)]
pub struct ExpiringLot {
    pub amount: i64,
    pub expires_at: DateTime<Utc>,
}

/// One wallet in the detail view, with its soonest-expiring lots.
#[derive(Debug, Serialize)]
pub struct WalletDetail {
    pub wallet_type: String,
    pub display_name: String,
    pub icon: &'static str,
    pub balance: i64,

    /// The next 10 non-expired earn entries, ascending by expiry
    pub expiring_soon: Vec<ExpiringLot>,
}

/// One row of the cross-wallet recent-transaction feed.
#[derive(Debug, Serialize)]
pub struct RecentTransaction {
    pub date: DateTime<Utc>,

    #[serde(rename = "type")]
    pub entry_type: String,

    pub amount: i64,
    pub wallet_type: String,
    pub description: Option<String>,
}

/// Response body for `view=checkout`.
///
/// # JSON Example
///
/// ```json
/// {
///   "total_available": 350,
///   "max_deduction": 100,
///   "deduction_min_order": 1000,
///   "deduction_max_pct": 0.1,
///   "order_qualifies": true,
///   "nearest_expiry": { "amount": 50, "date": "2026-09-30T15:59:59Z" },
///   "breakdown": [
///     { "wallet_type": "shopping_credit", "display_name": "Shopping Credit", "icon": "wallet", "balance": 200 },
///     { "wallet_type": "birthday", "display_name": "Birthday Credit", "icon": "cake", "balance": 0 },
///     { "wallet_type": "points", "display_name": "Loyalty Points", "icon": "star", "balance": 150 }
///   ]
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct CheckoutBalanceResponse {
    pub total_available: i64,
    pub max_deduction: i64,
    pub deduction_min_order: i64,
    pub deduction_max_pct: f64,
    pub order_qualifies: bool,
    pub nearest_expiry: Option<NearestExpiry>,
    pub breakdown: Vec<WalletBreakdown>,
}

/// Response body for `view=detail`.
#[derive(Debug, Serialize)]
pub struct DetailBalanceResponse {
    pub total_available: i64,
    pub wallets: Vec<WalletDetail>,

    /// The 10 most recent ledger entries of any type, newest first
    pub recent_transactions: Vec<RecentTransaction>,
}

/// Either balance view, serialized as its inner shape.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BalanceResponse {
    Checkout(CheckoutBalanceResponse),
    Detail(DetailBalanceResponse),
}
