//! Refund and spend request/response types.
//!
//! Both mutating order paths share the per-wallet allocation breakdown
//! shape: the refund reverses a prior deduction proportionally, the spend
//! drains wallets in display-priority order at checkout.

use serde::{Deserialize, Serialize};

/// Request to reverse an order's credit deduction.
///
/// # JSON Example
///
/// ```json
/// {
///   "order_id": "order_01HZX",
///   "refund_amount": 60,
///   "reason": "Customer returned item"
/// }
/// ```
///
/// # Idempotency
///
/// Re-sending the same order_id after a successful refund is a no-op that
/// returns `{"success": true, "skipped": true}` - duplicate gateway
/// webhooks must never double-credit.
#[derive(Debug, Deserialize)]
pub struct RefundRequest {
    /// Order whose deduction is being reversed
    pub order_id: Option<String>,

    /// Amount to refund (positive, at most the original deduction)
    pub refund_amount: Option<i64>,

    /// Optional human-readable reason recorded on the refund entries
    pub reason: Option<String>,
}

/// Request to deduct credits for an order being placed.
///
/// If `order_subtotal` is supplied, the amount is validated against the
/// merchant's deduction rule (minimum order and maximum coverage) before
/// any wallet is touched.
#[derive(Debug, Deserialize)]
pub struct SpendRequest {
    /// Order the deduction belongs to
    pub order_id: Option<String>,

    /// Customer whose wallets are debited
    pub customer_id: Option<String>,

    /// Amount to deduct (must be positive)
    pub amount: Option<i64>,

    /// Order subtotal, for deduction-rule validation
    pub order_subtotal: Option<i64>,

    /// Optional description shown in transaction history
    pub description: Option<String>,
}

/// How much one wallet contributed to (or received from) an order
/// operation.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WalletAllocation {
    pub wallet_type: String,
    pub display_name: String,
    pub amount: i64,
}

/// Response for the refund endpoint.
///
/// Successful allocation:
/// `{"success": true, "total_refunded": 60, "allocation": [...]}`
///
/// Idempotent replay:
/// `{"success": true, "skipped": true}`
#[derive(Debug, Serialize)]
pub struct RefundResponse {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_refunded: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocation: Option<Vec<WalletAllocation>>,
}

impl RefundResponse {
    /// Response for an idempotent replay: no writes happened.
    pub fn skipped() -> Self {
        Self {
            success: true,
            skipped: Some(true),
            total_refunded: None,
            allocation: None,
        }
    }

    /// Response for a completed allocation.
    pub fn completed(total_refunded: i64, allocation: Vec<WalletAllocation>) -> Self {
        Self {
            success: true,
            skipped: None,
            total_refunded: Some(total_refunded),
            allocation: Some(allocation),
        }
    }
}

/// Response for the spend endpoint, mirroring the refund shape.
#[derive(Debug, Serialize)]
pub struct SpendResponse {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_spent: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocation: Option<Vec<WalletAllocation>>,
}

impl SpendResponse {
    /// Response for an idempotent replay: the order was already deducted.
    pub fn skipped() -> Self {
        Self {
            success: true,
            skipped: Some(true),
            total_spent: None,
            allocation: None,
        }
    }

    /// Response for a completed deduction.
    pub fn completed(total_spent: i64, allocation: Vec<WalletAllocation>) -> Self {
        Self {
            success: true,
            skipped: None,
            total_spent: Some(total_spent),
            allocation: Some(allocation),
        }
    }
}
