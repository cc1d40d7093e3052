//! Refund allocator - proportional, rounding-exact reversal of an order's
//! credit deduction.
//!
//! # Allocation Contract
//!
//! Contributing wallets are iterated in a fixed, deterministic order: by
//! the `created_at` of each wallet's earliest spend entry for the order,
//! ties broken by wallet id. Every wallet except the last receives
//! `floor(refund_amount * spent / total_spent)`; the last wallet receives
//! whatever remains, so the allocations always sum to exactly
//! `refund_amount`. This is a remainder-to-last rule, not a
//! largest-remainder method: deterministic, order-dependent, and part of
//! the wire contract.
//!
//! # Idempotency
//!
//! A refund for an order that already has refund entries returns
//! `skipped` and performs zero writes. The check runs twice (a fast path
//! before the transaction, and again after the wallet rows are locked),
//! and a partial unique index on refund references converts a concurrent
//! duplicate into `skipped` instead of a double credit.
//!
//! # Atomicity
//!
//! All refund entries and balance increments for one order commit in a
//! single database transaction: either every contributing wallet is
//! refunded or none is.

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        ledger_entry::NewLedgerEntry,
        refund::WalletAllocation,
        wallet,
    },
    services::ledger_service,
};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

/// Name of the partial unique index backing refund idempotency.
const REFUND_UNIQUE_INDEX: &str = "uq_wallet_transactions_refund";

/// Outcome of a refund request.
#[derive(Debug)]
pub struct RefundOutcome {
    /// True when the order was already refunded and nothing was written
    pub skipped: bool,

    /// Total credited back across wallets (0 when skipped)
    pub total_refunded: i64,

    /// Per-wallet breakdown in allocation order (empty when skipped)
    pub allocation: Vec<WalletAllocation>,
}

/// Split `refund_amount` across wallets proportionally to what each spent.
///
/// `spent` must be non-empty, all-positive, and sum to at least
/// `refund_amount`. Every share but the last is floored; the last share
/// absorbs the rounding remainder so the total is exact.
pub fn allocate_remainder_to_last(refund_amount: i64, spent: &[i64]) -> Vec<i64> {
    let total_spent: i64 = spent.iter().sum();
    debug_assert!(total_spent >= refund_amount && refund_amount > 0);

    let mut allocations = Vec::with_capacity(spent.len());
    let mut allocated: i64 = 0;

    for (i, &wallet_spent) in spent.iter().enumerate() {
        let share = if i == spent.len() - 1 {
            // Last wallet absorbs the remainder: the sum is exact by
            // construction, no currency lost or invented.
            refund_amount - allocated
        } else {
            // Widened product: ledger-derived amounts can be large enough
            // for the i64 intermediate to overflow. The quotient is at
            // most refund_amount, so the narrowing cast is lossless.
            (i128::from(refund_amount) * i128::from(wallet_spent) / i128::from(total_spent)) as i64
        };
        allocated += share;
        allocations.push(share);
    }

    allocations
}

/// One wallet's aggregated spend for the order, in iteration order.
#[derive(Debug, sqlx::FromRow)]
struct Contribution {
    wallet_id: Uuid,
    wallet_type: String,
    spent: i64,
}

/// Does any refund entry already exist for this order within the merchant
/// scope?
async fn refund_exists<'e, E>(executor: E, merchant_code: &str, order_id: &str) -> Result<bool, AppError>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1
            FROM wallet_transactions t
            JOIN wallets w ON w.id = t.wallet_id
            WHERE t.entry_type = 'refund'
              AND t.reference_type = 'order_refund'
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

/// Fetch the wallets that contributed spend entries to the order, with
/// each wallet's absolute spend total, in the contract's iteration order.
async fn load_contributions(
    tx: &mut Transaction<'_, Postgres>,
    merchant_code: &str,
    order_id: &str,
) -> Result<Vec<Contribution>, AppError> {
    let contributions = sqlx::query_as::<_, Contribution>(
        r#"
        SELECT
            w.id AS wallet_id,
            w.wallet_type,
            (-SUM(t.amount))::BIGINT AS spent
        FROM wallet_transactions t
        JOIN wallets w ON w.id = t.wallet_id
        WHERE t.entry_type = 'spend'
          AND t.reference_type = 'order'
          AND t.reference_id = $1
          AND w.merchant_code = $2
        GROUP BY w.id, w.wallet_type
        ORDER BY MIN(t.created_at) ASC, w.id ASC
        "#,
    )
    .bind(order_id)
    .bind(merchant_code)
    .fetch_all(&mut **tx)
    .await?;

    Ok(contributions)
}

/// Was this sqlx error a violation of the refund idempotency index?
fn is_duplicate_refund(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.constraint() == Some(REFUND_UNIQUE_INDEX)
    )
}

/// Proportionally reverse an order's credit deduction.
///
/// # Process
///
/// 1. Validate the refund amount
/// 2. Fast-path idempotency check (no transaction)
/// 3. Begin a database transaction
/// 4. Load the order's spend contributions; 404 when there are none
/// 5. Lock the contributing wallet rows (in id order) and re-check
///    idempotency under the lock
/// 6. Reject refunds larger than the original deduction
/// 7. Allocate remainder-to-last and, per wallet with a positive share,
///    append a refund entry and atomically increment the balance
/// 8. Commit - all wallets or none
///
/// # Errors
///
/// - `INVALID_REFUND_AMOUNT`: amount is not a positive integer
/// - `NO_DEDUCTION_FOUND`: the order has no spend entries (404)
/// - `REFUND_EXCEEDS_DEDUCTION`: amount above the original deduction; the
///   error carries `original_deduction` for client display
pub async fn refund_order(
    pool: &DbPool,
    merchant_code: &str,
    order_id: &str,
    refund_amount: i64,
    reason: Option<&str>,
) -> Result<RefundOutcome, AppError> {
    if refund_amount <= 0 {
        return Err(AppError::InvalidRefundAmount);
    }

    // Fast path: a retry or duplicate webhook call must be a no-op.
    if refund_exists(pool, merchant_code, order_id).await? {
        return Ok(RefundOutcome {
            skipped: true,
            total_refunded: 0,
            allocation: Vec::new(),
        });
    }

    let mut tx = pool.begin().await?;

    let contributions = load_contributions(&mut tx, merchant_code, order_id).await?;
    if contributions.is_empty() {
        return Err(AppError::NoDeductionFound);
    }

    // Lock wallet rows in id order (deadlock-safe against other
    // multi-wallet writers), then re-check idempotency under the lock.
    let mut wallet_ids: Vec<Uuid> = contributions.iter().map(|c| c.wallet_id).collect();
    wallet_ids.sort();
    sqlx::query("SELECT id FROM wallets WHERE id = ANY($1) ORDER BY id FOR UPDATE")
        .bind(&wallet_ids)
        .fetch_all(&mut *tx)
        .await?;

    if refund_exists(&mut *tx, merchant_code, order_id).await? {
        return Ok(RefundOutcome {
            skipped: true,
            total_refunded: 0,
            allocation: Vec::new(),
        });
    }

    let total_spent: i64 = contributions.iter().map(|c| c.spent).sum();
    if refund_amount > total_spent {
        return Err(AppError::RefundExceedsDeduction {
            original_deduction: total_spent,
        });
    }

    let spent: Vec<i64> = contributions.iter().map(|c| c.spent).collect();
    let shares = allocate_remainder_to_last(refund_amount, &spent);

    let description = match reason {
        Some(reason) => format!("Refund for order {order_id}: {reason}"),
        None => format!("Refund for order {order_id}"),
    };

    let mut allocation = Vec::new();
    for (contribution, share) in contributions.iter().zip(shares) {
        if share <= 0 {
            continue;
        }

        let insert = ledger_service::append_entry(
            &mut tx,
            &NewLedgerEntry {
                wallet_id: contribution.wallet_id,
                wallet_type: contribution.wallet_type.clone(),
                entry_type: "refund",
                amount: share,
                reference_type: Some("order_refund".to_string()),
                reference_id: Some(order_id.to_string()),
                description: Some(description.clone()),
                expires_at: None,
                operator_type: "system",
            },
        )
        .await;

        if let Err(err) = insert {
            if is_duplicate_refund(&err) {
                // A concurrent request won the race; ours becomes a no-op.
                tx.rollback().await?;
                return Ok(RefundOutcome {
                    skipped: true,
                    total_refunded: 0,
                    allocation: Vec::new(),
                });
            }
            tracing::error!(error = %err, order_id, "refund entry insert failed");
            return Err(AppError::TxInsertFailed);
        }

        ledger_service::apply_balance_delta(&mut tx, contribution.wallet_id, share).await?;

        allocation.push(WalletAllocation {
            wallet_type: contribution.wallet_type.clone(),
            display_name: wallet::display_name(&contribution.wallet_type),
            amount: share,
        });
    }

    tx.commit().await?;

    tracing::info!(
        order_id,
        refund_amount,
        wallets = allocation.len(),
        "refund allocated"
    );

    Ok(RefundOutcome {
        skipped: false,
        total_refunded: refund_amount,
        allocation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proportional_split_with_remainder_to_last() {
        // Order spent 80 + 20, refund 60:
        // floor(60 * 80 / 100) = 48, last wallet gets 60 - 48 = 12.
        let shares = allocate_remainder_to_last(60, &[80, 20]);
        assert_eq!(shares, vec![48, 12]);
        assert_eq!(shares.iter().sum::<i64>(), 60);
    }

    #[test]
    fn single_wallet_gets_everything() {
        assert_eq!(allocate_remainder_to_last(100, &[100]), vec![100]);
        assert_eq!(allocate_remainder_to_last(33, &[100]), vec![33]);
    }

    #[test]
    fn full_refund_restores_each_wallet_exactly() {
        let shares = allocate_remainder_to_last(100, &[80, 20]);
        assert_eq!(shares, vec![80, 20]);
    }

    #[test]
    fn rounding_remainder_lands_on_last_wallet() {
        // 10 split over three equal spenders: 3 + 3 + 4.
        let shares = allocate_remainder_to_last(10, &[50, 50, 50]);
        assert_eq!(shares, vec![3, 3, 4]);
        assert_eq!(shares.iter().sum::<i64>(), 10);
    }

    #[test]
    fn tiny_refund_can_skip_small_contributors() {
        // floor(1 * 1 / 100) = 0 for the first wallet; last takes it all.
        let shares = allocate_remainder_to_last(1, &[1, 99]);
        assert_eq!(shares, vec![0, 1]);
    }

    #[test]
    fn large_ledger_amounts_do_not_overflow() {
        // 6e18 + 3e18 spent; refunding half must not wrap the
        // proportional product.
        let spent = [6_000_000_000_000_000_000_i64, 3_000_000_000_000_000_000];
        let shares = allocate_remainder_to_last(4_500_000_000_000_000_000, &spent);
        assert_eq!(
            shares,
            vec![3_000_000_000_000_000_000, 1_500_000_000_000_000_000]
        );
        assert_eq!(shares.iter().sum::<i64>(), 4_500_000_000_000_000_000);
    }

    #[test]
    fn allocations_always_sum_exactly() {
        let partitions: &[&[i64]] = &[
            &[1, 1, 1],
            &[7, 13, 29],
            &[999, 1],
            &[250, 250, 250, 250],
            &[3, 5, 7, 11, 13],
        ];
        for spent in partitions {
            let total: i64 = spent.iter().sum();
            for refund in 1..=total {
                let shares = allocate_remainder_to_last(refund, spent);
                assert_eq!(
                    shares.iter().sum::<i64>(),
                    refund,
                    "partition {spent:?}, refund {refund}"
                );
                assert!(shares.iter().all(|&s| s >= 0));
            }
        }
    }
}
