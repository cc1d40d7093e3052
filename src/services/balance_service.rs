//! Balance aggregator - the read side of the credit ledger.
//!
//! Sums a customer's wallet balances, evaluates whether an order qualifies
//! for a credit deduction and how large it may be, reports the nearest
//! expiring credit lot, and (in the detail view) surfaces soon-to-expire
//! lots and recent transactions.
//!
//! Pure read path: no side effects, safe to call concurrently and
//! repeatedly.

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        balance::*,
        wallet::{self, DeductionRule, Wallet, WalletType},
    },
};
use chrono::{DateTime, Utc};

/// How many expiring lots the detail view lists per wallet.
const EXPIRING_SOON_LIMIT: i64 = 10;

/// How many entries the cross-wallet recent-transaction feed holds.
const RECENT_TRANSACTIONS_LIMIT: i64 = 10;

/// Load the merchant's deduction rule, falling back to the service-level
/// defaults when the merchant has no row.
pub async fn load_deduction_rule(
    pool: &DbPool,
    merchant_code: &str,
    defaults: DeductionRule,
) -> Result<DeductionRule, AppError> {
    let rule = sqlx::query_as::<_, DeductionRule>(
        r#"
        SELECT deduction_min_order AS min_order, deduction_max_bps AS max_bps
        FROM deduction_rules
        WHERE merchant_code = $1
        "#,
    )
    .bind(merchant_code)
    .fetch_optional(pool)
    .await?;

    Ok(rule.unwrap_or(defaults))
}

/// Evaluate deduction eligibility for an order.
///
/// Returns `(order_qualifies, max_deduction)`:
/// - the order qualifies when a subtotal was supplied and it meets the
///   merchant's minimum
/// - when qualified, the cap is the smaller of the customer's total credit
///   and `floor(subtotal * max_pct)`, computed as exact integer math in
///   basis points
///
/// The subtotal is caller-supplied and may be arbitrarily large, so the
/// basis-point product is widened to i128 before the division; the final
/// cap is bounded by `total_available`, which fits i64.
pub fn evaluate_deduction(
    total_available: i64,
    order_subtotal: Option<i64>,
    rule: &DeductionRule,
) -> (bool, i64) {
    let Some(subtotal) = order_subtotal else {
        return (false, 0);
    };
    if subtotal < rule.min_order {
        return (false, 0);
    }

    let pct_cap = i128::from(subtotal) * i128::from(rule.max_bps) / 10_000;
    let max_deduction = i128::from(total_available).min(pct_cap) as i64;
    (true, max_deduction)
}

/// Build the per-wallet-type breakdown in fixed display-priority order.
///
/// Every known wallet type appears even at balance 0; unknown types from
/// actual wallet rows sort after the known ones, alphabetically.
pub fn build_breakdown(wallets: &[Wallet]) -> Vec<WalletBreakdown> {
    let mut breakdown: Vec<WalletBreakdown> = WalletType::ALL
        .iter()
        .map(|t| WalletBreakdown {
            wallet_type: t.as_str().to_string(),
            display_name: t.display_name().to_string(),
            icon: t.icon(),
            balance: 0,
        })
        .collect();

    let mut unknown: Vec<WalletBreakdown> = Vec::new();
    for w in wallets {
        match breakdown
            .iter_mut()
            .find(|row| row.wallet_type == w.wallet_type)
        {
            Some(row) => row.balance = w.balance,
            None => unknown.push(WalletBreakdown {
                wallet_type: w.wallet_type.clone(),
                display_name: wallet::display_name(&w.wallet_type),
                icon: wallet::icon(&w.wallet_type),
                balance: w.balance,
            }),
        }
    }
    unknown.sort_by(|a, b| a.wallet_type.cmp(&b.wallet_type));
    breakdown.extend(unknown);
    breakdown
}

/// Row shape for the nearest-expiry query.
#[derive(Debug, sqlx::FromRow)]
struct ExpiryRow {
    amount: i64,
    expires_at: DateTime<Utc>,
}

/// Find the single earn entry, across all given wallets, with the smallest
/// `expires_at` strictly in the future.
///
/// NOTE: the scan is merged across all of the customer's wallet types (a
/// flat wallet-id list, no type filter); see DESIGN.md for the open
/// product question on per-type scoping.
async fn nearest_expiry(
    pool: &DbPool,
    wallet_ids: &[uuid::Uuid],
) -> Result<Option<NearestExpiry>, AppError> {
    if wallet_ids.is_empty() {
        return Ok(None);
    }

    let row = sqlx::query_as::<_, ExpiryRow>(
        r#"
        SELECT amount, expires_at
        FROM wallet_transactions
        WHERE wallet_id = ANY($1)
          AND entry_type = 'earn'
          AND expires_at > NOW()
        ORDER BY expires_at ASC
        LIMIT 1
        "#,
    )
    .bind(wallet_ids)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| NearestExpiry {
        amount: r.amount,
        date: r.expires_at,
    }))
}

/// The next non-expired earn lots for one wallet, soonest first.
async fn expiring_soon(
    pool: &DbPool,
    wallet_id: uuid::Uuid,
) -> Result<Vec<ExpiringLot>, AppError> {
    let rows = sqlx::query_as::<_, ExpiryRow>(
        r#"
        SELECT amount, expires_at
        FROM wallet_transactions
        WHERE wallet_id = $1
          AND entry_type = 'earn'
          AND expires_at > NOW()
        ORDER BY expires_at ASC
        LIMIT $2
        "#,
    )
    .bind(wallet_id)
    .bind(EXPIRING_SOON_LIMIT)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| ExpiringLot {
            amount: r.amount,
            expires_at: r.expires_at,
        })
        .collect())
}

/// Row shape for the recent-transaction feed.
#[derive(Debug, sqlx::FromRow)]
struct RecentRow {
    created_at: DateTime<Utc>,
    entry_type: String,
    amount: i64,
    wallet_type: String,
    description: Option<String>,
}

/// The most recent ledger entries of any type across the given wallets,
/// newest first.
async fn recent_transactions(
    pool: &DbPool,
    wallet_ids: &[uuid::Uuid],
) -> Result<Vec<RecentTransaction>, AppError> {
    if wallet_ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, RecentRow>(
        r#"
        SELECT created_at, entry_type, amount, wallet_type, description
        FROM wallet_transactions
        WHERE wallet_id = ANY($1)
        ORDER BY created_at DESC
        LIMIT $2
        "#,
    )
    .bind(wallet_ids)
    .bind(RECENT_TRANSACTIONS_LIMIT)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| RecentTransaction {
            date: r.created_at,
            entry_type: r.entry_type,
            amount: r.amount,
            wallet_type: r.wallet_type,
            description: r.description,
        })
        .collect())
}

/// Aggregate a customer's credit balance.
///
/// A customer with no wallets gets an all-zero result (not an error) with
/// a breakdown entry present for every known wallet type.
pub async fn get_balance(
    pool: &DbPool,
    merchant_code: &str,
    customer_id: &str,
    order_subtotal: Option<i64>,
    view: BalanceView,
    deduction_defaults: DeductionRule,
) -> Result<BalanceResponse, AppError> {
    let wallets = sqlx::query_as::<_, Wallet>(
        r#"
        SELECT id, customer_id, merchant_code, wallet_type, balance, created_at, updated_at
        FROM wallets
        WHERE merchant_code = $1 AND customer_id = $2
        "#,
    )
    .bind(merchant_code)
    .bind(customer_id)
    .fetch_all(pool)
    .await?;

    let total_available: i64 = wallets.iter().map(|w| w.balance).sum();
    let wallet_ids: Vec<uuid::Uuid> = wallets.iter().map(|w| w.id).collect();
    let breakdown = build_breakdown(&wallets);

    match view {
        BalanceView::Checkout => {
            let rule = load_deduction_rule(pool, merchant_code, deduction_defaults).await?;
            let (order_qualifies, max_deduction) =
                evaluate_deduction(total_available, order_subtotal, &rule);
            let nearest_expiry = nearest_expiry(pool, &wallet_ids).await?;

            Ok(BalanceResponse::Checkout(CheckoutBalanceResponse {
                total_available,
                max_deduction,
                deduction_min_order: rule.min_order,
                deduction_max_pct: rule.max_pct(),
                order_qualifies,
                nearest_expiry,
                breakdown,
            }))
        }
        BalanceView::Detail => {
            let mut details = Vec::with_capacity(breakdown.len());
            for row in breakdown {
                // Breakdown rows without a backing wallet have no entries.
                let lots = match wallets.iter().find(|w| w.wallet_type == row.wallet_type) {
                    Some(w) => expiring_soon(pool, w.id).await?,
                    None => Vec::new(),
                };
                details.push(WalletDetail {
                    wallet_type: row.wallet_type,
                    display_name: row.display_name,
                    icon: row.icon,
                    balance: row.balance,
                    expiring_soon: lots,
                });
            }

            let recent = recent_transactions(pool, &wallet_ids).await?;

            Ok(BalanceResponse::Detail(DetailBalanceResponse {
                total_available,
                wallets: details,
                recent_transactions: recent,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(min_order: i64, max_bps: i32) -> DeductionRule {
        DeductionRule { min_order, max_bps }
    }

    #[test]
    fn deduction_capped_by_percentage() {
        // 350 credit, subtotal 1000, min 1000, 10% cap -> 100
        let (qualifies, max) = evaluate_deduction(350, Some(1000), &rule(1000, 1000));
        assert!(qualifies);
        assert_eq!(max, 100);
    }

    #[test]
    fn deduction_capped_by_available_balance() {
        let (qualifies, max) = evaluate_deduction(30, Some(1000), &rule(1000, 1000));
        assert!(qualifies);
        assert_eq!(max, 30);
    }

    #[test]
    fn subtotal_below_minimum_disqualifies() {
        // 999 < 1000 minimum, even though credit is available
        let (qualifies, max) = evaluate_deduction(350, Some(999), &rule(1000, 1000));
        assert!(!qualifies);
        assert_eq!(max, 0);
    }

    #[test]
    fn missing_subtotal_disqualifies() {
        let (qualifies, max) = evaluate_deduction(350, None, &rule(1000, 1000));
        assert!(!qualifies);
        assert_eq!(max, 0);
    }

    #[test]
    fn percentage_cap_floors() {
        // 15% of 999 = 149.85, floored to 149
        let (_, max) = evaluate_deduction(10_000, Some(999), &rule(0, 1500));
        assert_eq!(max, 149);
    }

    #[test]
    fn huge_subtotal_does_not_overflow_the_cap() {
        // The subtotal is caller-supplied; the basis-point product must
        // not wrap. The cap stays bounded by the available balance.
        let (qualifies, max) = evaluate_deduction(350, Some(i64::MAX), &rule(0, 1000));
        assert!(qualifies);
        assert_eq!(max, 350);

        // And with an unbounded balance, the cap is the exact floored
        // 10% of the subtotal, never negative.
        let (_, max) = evaluate_deduction(i64::MAX, Some(i64::MAX), &rule(0, 1000));
        assert_eq!(i128::from(max), i128::from(i64::MAX) * 1000 / 10_000);
        assert!(max >= 0);
    }

    fn wallet(wallet_type: &str, balance: i64) -> Wallet {
        let now = chrono::Utc::now();
        Wallet {
            id: uuid::Uuid::new_v4(),
            customer_id: "cus_1".to_string(),
            merchant_code: "m1".to_string(),
            wallet_type: wallet_type.to_string(),
            balance,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn breakdown_lists_every_known_type_at_zero() {
        let breakdown = build_breakdown(&[]);
        let types: Vec<&str> = breakdown.iter().map(|b| b.wallet_type.as_str()).collect();
        assert_eq!(types, vec!["shopping_credit", "birthday", "points"]);
        assert!(breakdown.iter().all(|b| b.balance == 0));
    }

    #[test]
    fn breakdown_preserves_display_order_and_appends_unknown_types() {
        let wallets = vec![
            wallet("points", 150),
            wallet("zeta_credit", 5),
            wallet("shopping_credit", 200),
            wallet("alpha_credit", 7),
        ];
        let breakdown = build_breakdown(&wallets);
        let types: Vec<&str> = breakdown.iter().map(|b| b.wallet_type.as_str()).collect();
        assert_eq!(
            types,
            vec![
                "shopping_credit",
                "birthday",
                "points",
                "alpha_credit",
                "zeta_credit"
            ]
        );
        assert_eq!(breakdown[0].balance, 200);
        assert_eq!(breakdown[1].balance, 0);
        assert_eq!(breakdown[2].balance, 150);
    }
}
