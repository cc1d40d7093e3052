//! API key authentication middleware.
//!
//! This middleware intercepts every protected request to:
//! 1. Extract the API key from the Authorization header
//! 2. Hash it and verify it exists in the database
//! 3. Inject the resolved merchant scope into the request
//! 4. Reject unauthorized requests with HTTP 401

use crate::{AppState, error::AppError, models::api_key::ApiKey};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Merchant (tenant) context attached to authenticated requests.
///
/// This struct is inserted into the request's extension map and extracted
/// by route handlers. The `merchant_code` is the explicit tenant scope:
/// every wallet and ledger query filters on it, so one merchant can never
/// read or mutate another merchant's credit pools.
#[derive(Debug, Clone)]
pub struct MerchantContext {
    /// ID of the authenticated API key
    pub api_key_id: Uuid,

    /// Tenant scope for every ledger operation in this request
    pub merchant_code: String,
}

/// API key authentication middleware function.
///
/// # Flow
///
/// 1. Extract `Authorization: Bearer <key>` header from request
/// 2. Hash the `<key>` using SHA-256
/// 3. Query database for matching hash where `is_active = true`
/// 4. If found: inject `MerchantContext` into request, call next handler
/// 5. If not found: return 401 Unauthorized error
///
/// # Headers
///
/// Expected header format:
/// ```text
/// Authorization: Bearer abc123xyz
/// ```
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Step 1: Extract Authorization header
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::InvalidApiKey)?;

    // Step 2: Extract Bearer token
    // Expected format: "Bearer <api_key>"
    let api_key = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::InvalidApiKey)?;

    // Step 3: Hash the API key using SHA-256
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    let key_hash = hex::encode(hasher.finalize());

    // Step 4: Lookup hashed key in database
    let api_key_record = sqlx::query_as::<_, ApiKey>(
        "SELECT id, key_hash, merchant_code, label, is_active, created_at
         FROM api_keys
         WHERE key_hash = $1 AND is_active = true",
    )
    .bind(&key_hash)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::InvalidApiKey)?;

    // Step 5: Create the merchant context
    let merchant_context = MerchantContext {
        api_key_id: api_key_record.id,
        merchant_code: api_key_record.merchant_code,
    };

    // Step 6: Inject context into request extensions
    // Route handlers can now extract this using Extension<MerchantContext>
    request.extensions_mut().insert(merchant_context);

    // Step 7: Call the next middleware/handler
    Ok(next.run(request).await)
}
