//! Earn and adjust HTTP handlers.
//!
//! - `POST /api/v1/credits/earn` - grant credit (creates wallets lazily)
//! - `POST /api/v1/credits/adjust` - admin balance correction

use crate::{
    AppState,
    error::AppError,
    middleware::auth::MerchantContext,
    models::ledger_entry::{AdjustRequest, EarnRequest, EntryWriteResponse},
    services::ledger_service,
};
use axum::{Extension, Json, extract::State};

/// Grant credit to a customer.
///
/// # Request Body
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
/// The wallet is created with balance 0 if this is the customer's first
/// credit event for the pool.
pub async fn create_earn(
    State(state): State<AppState>,
    Extension(merchant): Extension<MerchantContext>,
    Json(request): Json<EarnRequest>,
) -> Result<Json<EntryWriteResponse>, AppError> {
    let customer_id = request
        .customer_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(AppError::MissingCustomerId)?;

    let (entry, balance) =
        ledger_service::earn_credit(&state.pool, &merchant.merchant_code, customer_id, &request)
            .await?;

    Ok(Json(EntryWriteResponse::from_entry(entry, balance)))
}

/// Apply an admin balance correction.
///
/// Amount is signed and non-zero; negative corrections cannot drive the
/// balance below zero, and the wallet must already exist.
pub async fn create_adjustment(
    State(state): State<AppState>,
    Extension(merchant): Extension<MerchantContext>,
    Json(request): Json<AdjustRequest>,
) -> Result<Json<EntryWriteResponse>, AppError> {
    let customer_id = request
        .customer_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(AppError::MissingCustomerId)?;

    let (entry, balance) =
        ledger_service::adjust_credit(&state.pool, &merchant.merchant_code, customer_id, &request)
            .await?;

    Ok(Json(EntryWriteResponse::from_entry(entry, balance)))
}
