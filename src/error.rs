//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// This enum represents all possible errors that can occur in the ledger
/// service. Each variant maps to a specific HTTP status code and a stable
/// uppercase error code that callers can branch on.
///
/// # Error Categories
///
/// - **Validation errors**: missing or invalid input (400, caller's fault)
/// - **Business-rule violations**: refund larger than the original
///   deduction, deduction above the allowed cap (400/422, surfaced with
///   enough data to explain the limit)
/// - **Not found**: no deduction on record, unknown wallet (404)
/// - **Infrastructure errors**: storage failures (500, logged with internal
///   detail, returned opaque)
///
/// Idempotent replays (a refund already processed) are intentionally NOT
/// errors; they return 200 with `skipped: true`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    ///
    /// This wraps any sqlx::Error using the `#[from]` attribute, which
    /// automatically implements `From<sqlx::Error> for AppError`.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// API key is missing, invalid, or inactive.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid API key")]
    InvalidApiKey,

    /// Balance query arrived without a customer id.
    #[error("customer_id is required")]
    MissingCustomerId,

    /// Refund request arrived without an order id.
    #[error("order_id is required")]
    MissingOrderId,

    /// Refund amount is zero, negative, or otherwise not a positive integer.
    #[error("refund_amount must be a positive integer")]
    InvalidRefundAmount,

    /// No spend entries exist for the order being refunded.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("No credit deduction found for this order")]
    NoDeductionFound,

    /// Refund is larger than the credits originally deducted for the order.
    ///
    /// Carries the original deduction total so the caller can render an
    /// actionable message. Returns HTTP 400 Bad Request.
    #[error("Refund amount exceeds the original deduction of {original_deduction}")]
    RefundExceedsDeduction { original_deduction: i64 },

    /// The referenced wallet does not exist for this customer and merchant.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Wallet not found")]
    WalletNotFound,

    /// Customer's combined credit balance cannot cover the requested spend.
    ///
    /// Returns HTTP 422 Unprocessable Entity.
    #[error("Insufficient credit balance")]
    InsufficientBalance,

    /// Appending a ledger entry failed after validation passed.
    #[error("Failed to record ledger entry")]
    TxInsertFailed,

    /// An atomic balance update matched no rows (wallet vanished or a
    /// guard condition rejected the delta).
    #[error("Failed to update wallet balance")]
    UpdateFailed,

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    /// The String contains details about what was invalid.
    #[error("Invalid request")]
    InvalidRequest(String),

    /// Catch-all for non-database internal failures.
    ///
    /// Returns HTTP 500 with an opaque message; the wrapped error is
    /// logged, never leaked to the caller.
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Convert AppError into an HTTP response.
///
/// This implementation allows Axum handlers to return `Result<T, AppError>`
/// and have errors automatically converted to proper HTTP responses.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "ERROR_CODE",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// `REFUND_EXCEEDS_DEDUCTION` additionally carries `original_deduction`
/// inside the error object so clients can display the limit.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Map each error variant to (HTTP status, error code, message)
        let (status, code, message) = match self {
            AppError::InvalidApiKey => {
                (StatusCode::UNAUTHORIZED, "INVALID_API_KEY", self.to_string())
            }
            AppError::MissingCustomerId => (
                StatusCode::BAD_REQUEST,
                "MISSING_CUSTOMER_ID",
                self.to_string(),
            ),
            AppError::MissingOrderId => {
                (StatusCode::BAD_REQUEST, "MISSING_ORDER_ID", self.to_string())
            }
            AppError::InvalidRefundAmount => (
                StatusCode::BAD_REQUEST,
                "INVALID_REFUND_AMOUNT",
                self.to_string(),
            ),
            AppError::NoDeductionFound => (
                StatusCode::NOT_FOUND,
                "NO_DEDUCTION_FOUND",
                self.to_string(),
            ),
            AppError::RefundExceedsDeduction { original_deduction } => {
                // Business-rule rejection with the limit attached for display.
                let body = Json(json!({
                    "error": {
                        "code": "REFUND_EXCEEDS_DEDUCTION",
                        "message": format!(
                            "Refund amount exceeds the original deduction of {original_deduction}"
                        ),
                        "original_deduction": original_deduction,
                    }
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::WalletNotFound => {
                (StatusCode::NOT_FOUND, "WALLET_NOT_FOUND", self.to_string())
            }
            AppError::InsufficientBalance => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "INSUFFICIENT_BALANCE",
                self.to_string(),
            ),
            AppError::TxInsertFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "TX_INSERT_FAILED",
                self.to_string(),
            ),
            AppError::UpdateFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "UPDATE_FAILED",
                self.to_string(),
            ),
            AppError::InvalidRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "INVALID_REQUEST", msg.clone())
            }
            AppError::Database(ref err) => {
                // Log the internal detail; the caller gets an opaque code.
                tracing::error!(error = %err, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DB_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Internal(ref err) => {
                tracing::error!(error = %err, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        // Build JSON response body
        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        // Return the response with status code and JSON body
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_map_to_expected_status_codes() {
        let cases: Vec<(AppError, StatusCode)> = vec![
            (AppError::MissingCustomerId, StatusCode::BAD_REQUEST),
            (AppError::MissingOrderId, StatusCode::BAD_REQUEST),
            (AppError::InvalidRefundAmount, StatusCode::BAD_REQUEST),
            (AppError::NoDeductionFound, StatusCode::NOT_FOUND),
            (AppError::WalletNotFound, StatusCode::NOT_FOUND),
            (AppError::InvalidApiKey, StatusCode::UNAUTHORIZED),
            (
                AppError::InsufficientBalance,
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                AppError::RefundExceedsDeduction {
                    original_deduction: 100,
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::Database(sqlx::Error::RowNotFound),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AppError::Internal(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            let response = error.into_response();
            assert_eq!(response.status(), expected);
        }
    }
}
