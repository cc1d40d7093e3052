//! Balance query HTTP handler.
//!
//! `GET /api/v1/credits/balance` - aggregate a customer's credit balance,
//! either as the checkout deduction allowance or the detail overview.

use crate::{
    AppState,
    error::AppError,
    middleware::auth::MerchantContext,
    models::balance::{BalanceQuery, BalanceResponse, BalanceView},
    services::balance_service,
};
use axum::{
    Extension, Json,
    extract::{Query, State},
};

/// Get a customer's credit balance.
///
/// # Query Parameters
///
/// - `customer_id` (required)
/// - `order_subtotal` (optional, non-negative): evaluate deduction
///   eligibility against this subtotal
/// - `view` (optional): `checkout` (default) or `detail`
///
/// # Response (200, checkout view)
///
/// ```json
/// {
///   "total_available": 350,
///   "max_deduction": 100,
///   "deduction_min_order": 1000,
///   "deduction_max_pct": 0.1,
///   "order_qualifies": true,
///   "nearest_expiry": null,
///   "breakdown": [ ... ]
/// }
/// ```
///
/// A customer with no wallets gets an all-zero 200, not an error.
pub async fn get_balance(
    State(state): State<AppState>,
    Extension(merchant): Extension<MerchantContext>,
    Query(params): Query<BalanceQuery>,
) -> Result<Json<BalanceResponse>, AppError> {
    let customer_id = params
        .customer_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(AppError::MissingCustomerId)?;

    if params.order_subtotal.is_some_and(|subtotal| subtotal < 0) {
        return Err(AppError::InvalidRequest(
            "order_subtotal must be non-negative".to_string(),
        ));
    }

    let view = BalanceView::parse(params.view.as_deref());

    let response = balance_service::get_balance(
        &state.pool,
        &merchant.merchant_code,
        customer_id,
        params.order_subtotal,
        view,
        state.deduction_defaults,
    )
    .await?;

    Ok(Json(response))
}
