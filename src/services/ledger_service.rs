//! Ledger store primitives - the single source of truth for credit state.
//!
//! Every write path (earn, spend, refund, adjust) goes through the same two
//! primitives inside one database transaction:
//! - [`append_entry`]: insert one immutable row into `wallet_transactions`
//! - [`apply_balance_delta`]: a single-statement atomic
//!   `balance = balance + delta` update
//!
//! # Atomicity Guarantees
//!
//! The cached wallet balance is only ever mutated through
//! `apply_balance_delta`, never through read-then-write across two round
//! trips. Concurrent writers to the same wallet (a checkout spend, a
//! refund, an admin adjustment) serialize on the row update inside the
//! database, so no increment can be lost.

use crate::{db::DbPool, error::AppError, models::ledger_entry::*, models::wallet::Wallet};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

/// The operator types a ledger entry may carry.
const OPERATOR_TYPES: [&str; 3] = ["system", "admin", "customer"];

/// Validate an optional operator_type input, defaulting to "system".
pub fn resolve_operator_type(raw: Option<&str>) -> Result<&'static str, AppError> {
    match raw {
        None => Ok("system"),
        Some(value) => OPERATOR_TYPES
            .iter()
            .find(|candidate| **candidate == value)
            .copied()
            .ok_or_else(|| {
                AppError::InvalidRequest(format!("unknown operator_type: {value}"))
            }),
    }
}

/// Find a customer's wallet for one credit pool, or create it with
/// balance 0.
///
/// Wallets are created lazily on the first credit event for a
/// (customer, wallet_type) pair and never deleted. The upsert makes
/// concurrent first-earn requests converge on the same row instead of
/// racing on the unique constraint.
pub async fn get_or_create_wallet(
    tx: &mut Transaction<'_, Postgres>,
    customer_id: &str,
    merchant_code: &str,
    wallet_type: &str,
) -> Result<Wallet, AppError> {
    let wallet = sqlx::query_as::<_, Wallet>(
        r#"
        INSERT INTO wallets (customer_id, merchant_code, wallet_type)
        VALUES ($1, $2, $3)
        ON CONFLICT (customer_id, merchant_code, wallet_type)
            DO UPDATE SET updated_at = NOW()
        RETURNING id, customer_id, merchant_code, wallet_type, balance, created_at, updated_at
        "#,
    )
    .bind(customer_id)
    .bind(merchant_code)
    .bind(wallet_type)
    .fetch_one(&mut **tx)
    .await?;

    Ok(wallet)
}

/// Find and row-lock a customer's wallet for one credit pool.
///
/// Returns `WalletNotFound` if it does not exist; used by paths that must
/// not create wallets (adjustments).
pub async fn lock_wallet(
    tx: &mut Transaction<'_, Postgres>,
    customer_id: &str,
    merchant_code: &str,
    wallet_type: &str,
) -> Result<Wallet, AppError> {
    let wallet = sqlx::query_as::<_, Wallet>(
        r#"
        SELECT id, customer_id, merchant_code, wallet_type, balance, created_at, updated_at
        FROM wallets
        WHERE customer_id = $1 AND merchant_code = $2 AND wallet_type = $3
        FOR UPDATE
        "#,
    )
    .bind(customer_id)
    .bind(merchant_code)
    .bind(wallet_type)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(AppError::WalletNotFound)?;

    Ok(wallet)
}

/// Append one immutable entry to the ledger.
///
/// Returns the raw `sqlx::Error` so callers can distinguish constraint
/// violations (the refund idempotency index) from other failures before
/// mapping to an `AppError`.
pub async fn append_entry(
    tx: &mut Transaction<'_, Postgres>,
    entry: &NewLedgerEntry,
) -> Result<LedgerEntry, sqlx::Error> {
    sqlx::query_as::<_, LedgerEntry>(
        r#"
        INSERT INTO wallet_transactions (
            wallet_id,
            wallet_type,
            entry_type,
            amount,
            reference_type,
            reference_id,
            description,
            expires_at,
            operator_type
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(entry.wallet_id)
    .bind(&entry.wallet_type)
    .bind(entry.entry_type)
    .bind(entry.amount)
    .bind(&entry.reference_type)
    .bind(&entry.reference_id)
    .bind(&entry.description)
    .bind(entry.expires_at)
    .bind(entry.operator_type)
    .fetch_one(&mut **tx)
    .await
}

/// Atomically apply a signed delta to a wallet's cached balance.
///
/// A single UPDATE statement, guarded so the balance can never go
/// negative. Returns the new balance, or `UpdateFailed` when the wallet is
/// gone or the guard rejected the delta (which callers prevent by checking
/// under a row lock first).
pub async fn apply_balance_delta(
    tx: &mut Transaction<'_, Postgres>,
    wallet_id: Uuid,
    delta: i64,
) -> Result<i64, AppError> {
    let balance: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE wallets
        SET balance = balance + $1,
            updated_at = NOW()
        WHERE id = $2 AND balance + $1 >= 0
        RETURNING balance
        "#,
    )
    .bind(delta)
    .bind(wallet_id)
    .fetch_optional(&mut **tx)
    .await?;

    balance.ok_or(AppError::UpdateFailed)
}

/// Grant credit to a customer (the `earn` write path).
///
/// The only path that creates wallets. The earn entry carries the optional
/// `expires_at` that drives expiry reporting.
///
/// # Errors
///
/// - `InvalidRequest`: amount not positive, or empty wallet_type
/// - `TX_INSERT_FAILED` / `UPDATE_FAILED`: write failures after validation
pub async fn earn_credit(
    pool: &DbPool,
    merchant_code: &str,
    customer_id: &str,
    request: &EarnRequest,
) -> Result<(LedgerEntry, i64), AppError> {
    if request.amount <= 0 {
        return Err(AppError::InvalidRequest(
            "amount must be a positive integer".to_string(),
        ));
    }
    if request.wallet_type.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "wallet_type is required".to_string(),
        ));
    }
    let operator_type = resolve_operator_type(request.operator_type.as_deref())?;

    let mut tx = pool.begin().await?;

    let wallet =
        get_or_create_wallet(&mut tx, customer_id, merchant_code, &request.wallet_type).await?;

    let entry = append_entry(
        &mut tx,
        &NewLedgerEntry {
            wallet_id: wallet.id,
            wallet_type: wallet.wallet_type.clone(),
            entry_type: "earn",
            amount: request.amount,
            reference_type: request.reference_type.clone(),
            reference_id: request.reference_id.clone(),
            description: request.description.clone(),
            expires_at: request.expires_at,
            operator_type,
        },
    )
    .await
    .map_err(|err| {
        tracing::error!(error = %err, "earn entry insert failed");
        AppError::TxInsertFailed
    })?;

    let balance = apply_balance_delta(&mut tx, wallet.id, request.amount).await?;

    tx.commit().await?;

    Ok((entry, balance))
}

/// Apply an admin balance correction (the `adjust` write path).
///
/// Amount is signed and non-zero. Negative adjustments are rejected when
/// the wallet balance cannot cover them; adjustments never create wallets.
///
/// # Errors
///
/// - `InvalidRequest`: zero amount, or a negative amount larger than the
///   wallet balance
/// - `WALLET_NOT_FOUND`: no wallet exists for this customer and pool
pub async fn adjust_credit(
    pool: &DbPool,
    merchant_code: &str,
    customer_id: &str,
    request: &AdjustRequest,
) -> Result<(LedgerEntry, i64), AppError> {
    if request.amount == 0 {
        return Err(AppError::InvalidRequest(
            "amount must be a non-zero integer".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    // Lock the row so the balance check below stays true until commit.
    let wallet = lock_wallet(&mut tx, customer_id, merchant_code, &request.wallet_type).await?;

    if request.amount < 0 && wallet.balance < -request.amount {
        return Err(AppError::InvalidRequest(format!(
            "adjustment of {} exceeds the wallet balance of {}",
            request.amount, wallet.balance
        )));
    }

    let entry = append_entry(
        &mut tx,
        &NewLedgerEntry {
            wallet_id: wallet.id,
            wallet_type: wallet.wallet_type.clone(),
            entry_type: "adjust",
            amount: request.amount,
            reference_type: request.reference_type.clone(),
            reference_id: request.reference_id.clone(),
            description: request.description.clone(),
            expires_at: None,
            operator_type: "admin",
        },
    )
    .await
    .map_err(|err| {
        tracing::error!(error = %err, "adjust entry insert failed");
        AppError::TxInsertFailed
    })?;

    let balance = apply_balance_delta(&mut tx, wallet.id, request.amount).await?;

    tx.commit().await?;

    Ok((entry, balance))
}
