//! Checkout deduction - the `spend` write path.
//!
//! Debits a customer's wallets when an order is placed. Wallets are
//! drained in display-priority order (shopping credit, then birthday
//! credit, then loyalty points, then any unknown pools) until the
//! requested amount is covered; each contributing wallet gets one negative
//! `spend` entry referencing the order.
//!
//! The drain order is a deliberate design decision and is NOT the mirror
//! image of the refund allocator: refunds reverse proportionally to what
//! was spent, while spends exhaust the most restricted pools first.
//!
//! Like the refund path, the whole deduction commits in one database
//! transaction, and a repeated request for an already-deducted order is a
//! no-op (`skipped`).

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        ledger_entry::NewLedgerEntry,
        refund::WalletAllocation,
        wallet::{self, DeductionRule, Wallet},
    },
    services::{balance_service, ledger_service},
};
use sqlx::Postgres;

/// Outcome of a spend request.
#[derive(Debug)]
pub struct SpendOutcome {
    /// True when the order already had spend entries and nothing was
    /// written
    pub skipped: bool,

    /// Total debited across wallets (0 when skipped)
    pub total_spent: i64,

    /// Per-wallet breakdown in drain order (empty when skipped)
    pub allocation: Vec<WalletAllocation>,
}

/// Does any spend entry already exist for this order within the merchant
/// scope?
async fn spend_exists<'e, E>(executor: E, merchant_code: &str, order_id: &str) -> Result<bool, AppError>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1
            FROM wallet_transactions t
            JOIN wallets w ON w.id = t.wallet_id
            WHERE t.entry_type = 'spend'
              AND t.reference_type = 'order'
              AND t.reference_id = $1
              AND w.merchant_code = $2
        )
        "#,
    )
    .bind(order_id)
    .bind(merchant_code)
    .fetch_one(executor)
    .await?;

    Ok(exists)
}

/// Deduct credits from a customer's wallets for an order.
///
/// When `order_subtotal` is supplied, the amount is validated against the
/// merchant's deduction rule before any wallet is touched: the order must
/// qualify (subtotal at or above the minimum) and the amount must not
/// exceed `max_deduction`.
///
/// # Errors
///
/// - `InvalidRequest`: non-positive amount, or amount above the allowed
///   deduction for the given subtotal
/// - `INSUFFICIENT_BALANCE`: the customer's combined credit cannot cover
///   the amount (422, no writes)
pub async fn spend_for_order(
    pool: &DbPool,
    merchant_code: &str,
    customer_id: &str,
    order_id: &str,
    amount: i64,
    order_subtotal: Option<i64>,
    description: Option<&str>,
    deduction_defaults: DeductionRule,
) -> Result<SpendOutcome, AppError> {
    if amount <= 0 {
        return Err(AppError::InvalidRequest(
            "amount must be a positive integer".to_string(),
        ));
    }

    // Clamp against the tenant's deduction rule when the checkout tells us
    // the subtotal.
    if order_subtotal.is_some() {
        let rule =
            balance_service::load_deduction_rule(pool, merchant_code, deduction_defaults).await?;
        let total_available = customer_total(pool, merchant_code, customer_id).await?;
        let (order_qualifies, max_deduction) =
            balance_service::evaluate_deduction(total_available, order_subtotal, &rule);

        if !order_qualifies {
            return Err(AppError::InvalidRequest(format!(
                "order subtotal is below the deduction minimum of {}",
                rule.min_order
            )));
        }
        if amount > max_deduction {
            return Err(AppError::InvalidRequest(format!(
                "deduction exceeds the allowed maximum of {max_deduction}"
            )));
        }
    }

    // Fast path: the checkout retrying an already-deducted order is a
    // no-op.
    if spend_exists(pool, merchant_code, order_id).await? {
        return Ok(SpendOutcome {
            skipped: true,
            total_spent: 0,
            allocation: Vec::new(),
        });
    }

    let mut tx = pool.begin().await?;

    // Lock all of the customer's wallets in id order (deadlock-safe), then
    // re-check idempotency under the lock.
    let mut wallets = sqlx::query_as::<_, Wallet>(
        r#"
        SELECT id, customer_id, merchant_code, wallet_type, balance, created_at, updated_at
        FROM wallets
        WHERE merchant_code = $1 AND customer_id = $2
        ORDER BY id
        FOR UPDATE
        "#,
    )
    .bind(merchant_code)
    .bind(customer_id)
    .fetch_all(&mut *tx)
    .await?;

    if spend_exists(&mut *tx, merchant_code, order_id).await? {
        return Ok(SpendOutcome {
            skipped: true,
            total_spent: 0,
            allocation: Vec::new(),
        });
    }

    let total_available: i64 = wallets.iter().map(|w| w.balance).sum();
    if total_available < amount {
        return Err(AppError::InsufficientBalance);
    }

    // Drain in display-priority order; unknown pools last, by name.
    wallets.sort_by(|a, b| {
        wallet::display_priority(&a.wallet_type)
            .cmp(&wallet::display_priority(&b.wallet_type))
            .then_with(|| a.wallet_type.cmp(&b.wallet_type))
    });

    let description = description
        .map(str::to_string)
        .unwrap_or_else(|| format!("Credit deduction for order {order_id}"));

    let mut remaining = amount;
    let mut allocation = Vec::new();
    for w in &wallets {
        if remaining == 0 {
            break;
        }
        let take = remaining.min(w.balance);
        if take == 0 {
            continue;
        }

        ledger_service::append_entry(
            &mut tx,
            &NewLedgerEntry {
                wallet_id: w.id,
                wallet_type: w.wallet_type.clone(),
                entry_type: "spend",
                amount: -take,
                reference_type: Some("order".to_string()),
                reference_id: Some(order_id.to_string()),
                description: Some(description.clone()),
                expires_at: None,
                operator_type: "customer",
            },
        )
        .await
        .map_err(|err| {
            tracing::error!(error = %err, order_id, "spend entry insert failed");
            AppError::TxInsertFailed
        })?;

        ledger_service::apply_balance_delta(&mut tx, w.id, -take).await?;

        allocation.push(WalletAllocation {
            wallet_type: w.wallet_type.clone(),
            display_name: wallet::display_name(&w.wallet_type),
            amount: take,
        });
        remaining -= take;
    }

    tx.commit().await?;

    tracing::info!(
        order_id,
        amount,
        wallets = allocation.len(),
        "credit deduction recorded"
    );

    Ok(SpendOutcome {
        skipped: false,
        total_spent: amount,
        allocation,
    })
}

/// Sum of the customer's wallet balances within the merchant scope.
async fn customer_total(
    pool: &DbPool,
    merchant_code: &str,
    customer_id: &str,
) -> Result<i64, AppError> {
    let total: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT SUM(balance)::BIGINT
        FROM wallets
        WHERE merchant_code = $1 AND customer_id = $2
        "#,
    )
    .bind(merchant_code)
    .bind(customer_id)
    .fetch_one(pool)
    .await?;

    Ok(total.unwrap_or(0))
}
