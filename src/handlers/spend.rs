//! Spend HTTP handler.
//!
//! `POST /api/v1/credits/spend` - deduct credits from a customer's wallets
//! for an order being placed.

use crate::{
    AppState,
    error::AppError,
    middleware::auth::MerchantContext,
    models::refund::{SpendRequest, SpendResponse},
    services::spend_service,
};
use axum::{Extension, Json, extract::State};

/// Deduct credits for an order.
///
/// # Request Body
///
/// ```json
/// {
///   "order_id": "order_01HZX",
///   "customer_id": "cus_123",
///   "amount": 100,
///   "order_subtotal": 1000
/// }
/// ```
///
/// When `order_subtotal` is present the amount is validated against the
/// merchant's deduction rule before any wallet is debited. Replaying the
/// same order returns `{"success": true, "skipped": true}`.
pub async fn spend_for_order(
    State(state): State<AppState>,
    Extension(merchant): Extension<MerchantContext>,
    Json(request): Json<SpendRequest>,
) -> Result<Json<SpendResponse>, AppError> {
    let order_id = request
        .order_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(AppError::MissingOrderId)?;

    let customer_id = request
        .customer_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(AppError::MissingCustomerId)?;

    let amount = request.amount.ok_or_else(|| {
        AppError::InvalidRequest("amount must be a positive integer".to_string())
    })?;

    let outcome = spend_service::spend_for_order(
        &state.pool,
        &merchant.merchant_code,
        customer_id,
        order_id,
        amount,
        request.order_subtotal,
        request.description.as_deref(),
        state.deduction_defaults,
    )
    .await?;

    let response = if outcome.skipped {
        SpendResponse::skipped()
    } else {
        SpendResponse::completed(outcome.total_spent, outcome.allocation)
    };

    Ok(Json(response))
}
