//! Refund HTTP handler.
//!
//! `POST /api/v1/credits/refund` - proportionally reverse an order's
//! credit deduction.

use crate::{
    AppState,
    error::AppError,
    middleware::auth::MerchantContext,
    models::refund::{RefundRequest, RefundResponse},
    services::refund_service,
};
use axum::{Extension, Json, extract::State};

/// Refund an order's credit deduction.
///
/// # Request Body
///
/// ```json
/// {
///   "order_id": "order_01HZX",
///   "refund_amount": 60,
///   "reason": "Customer returned item"
/// }
/// ```
///
/// # Response (200)
///
/// ```json
/// {
///   "success": true,
///   "total_refunded": 60,
///   "allocation": [
///     { "wallet_type": "shopping_credit", "display_name": "Shopping Credit", "amount": 48 },
///     { "wallet_type": "points", "display_name": "Loyalty Points", "amount": 12 }
///   ]
/// }
/// ```
///
/// Replaying the same order returns `{"success": true, "skipped": true}`
/// with zero writes.
pub async fn refund_order(
    State(state): State<AppState>,
    Extension(merchant): Extension<MerchantContext>,
    Json(request): Json<RefundRequest>,
) -> Result<Json<RefundResponse>, AppError> {
    let order_id = request
        .order_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(AppError::MissingOrderId)?;

    let refund_amount = request.refund_amount.ok_or(AppError::InvalidRefundAmount)?;

    let outcome = refund_service::refund_order(
        &state.pool,
        &merchant.merchant_code,
        order_id,
        refund_amount,
        request.reason.as_deref(),
    )
    .await?;

    let response = if outcome.skipped {
        RefundResponse::skipped()
    } else {
        RefundResponse::completed(outcome.total_refunded, outcome.allocation)
    };

    Ok(Json(response))
}
