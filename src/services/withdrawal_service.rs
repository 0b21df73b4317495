//! Withdrawal requests and their admin decisions.
//!
//! # Lifecycle
//!
//! 1. `request_withdrawal` debits the account with a `pending` withdrawal
//!    entry (the hold) and records a `pending` withdrawal request, in one
//!    unit of work
//! 2. `decide` resolves it exactly once:
//!    - approve: the hold becomes `success`, the money is gone for good;
//!      only a hold that is still `pending` can be settled
//!    - reject: the hold is refunded, the original entry becomes `failed`
//!
//! Lock order in `decide` is withdrawal row, then account row, then the
//! ledger entry. Nothing else locks a withdrawal row, so this cannot
//! deadlock against plain debits, which lock the account first.

use chrono::Utc;
use uuid::Uuid;

use crate::{
    db::{self, DbPool},
    error::AppError,
    models::{
        ledger::{DebitRequest, EntryKind, RefundRequest},
        notification::Notification,
        withdrawal::{
            Decision, PayoutDestination, PayoutDestinationRequest, WithdrawRequest,
            WithdrawalRequest, WithdrawalResponse, WithdrawalStatus,
        },
    },
    money::Money,
    services::{
        ledger::{self, Ledger},
        notification_service::Notifier,
        retry::with_retry,
    },
};

/// Place a withdrawal hold.
///
/// # Errors
///
/// - `InvalidAmount` / `InvalidRequest`: below `minimum` or missing details
/// - `InsufficientFunds`: amount exceeds the balance; nothing is written
pub async fn request_withdrawal(
    ledger: &Ledger,
    notifier: &Notifier,
    account_id: Uuid,
    request: &WithdrawRequest,
    minimum: Money,
) -> Result<WithdrawalResponse, AppError> {
    request.validate(minimum)?;

    let debit = DebitRequest {
        account_id,
        amount: request.amount,
        kind: EntryKind::Withdrawal,
        description: "Withdrawal request".to_string(),
        reference_id: None,
    };
    let debit = &debit;

    let (withdrawal, new_balance) = with_retry(ledger.retry_policy(), "withdraw", || async move {
        let mut tx = ledger.begin().await?;

        let entry = ledger::debit_tx(&mut tx, debit).await?;

        let withdrawal = sqlx::query_as::<_, WithdrawalRequest>(
            r#"
            INSERT INTO withdrawal_requests (
                account_id,
                ledger_entry_id,
                amount,
                method,
                destination
            )
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(account_id)
        .bind(entry.id)
        .bind(entry.amount)
        .bind(request.payment_method)
        .bind(request.destination.trim())
        .fetch_one(&mut *tx)
        .await?;

        db::commit(tx).await?;
        Ok((withdrawal, entry.balance_after))
    })
    .await?;

    tracing::info!(
        account_id = %account_id,
        withdrawal_id = %withdrawal.id,
        amount = %withdrawal.amount,
        "withdrawal requested"
    );
    notifier.enqueue(Notification::withdrawal_requested(account_id, withdrawal.amount));

    Ok(WithdrawalResponse {
        withdrawal_id: withdrawal.id,
        ledger_entry_id: withdrawal.ledger_entry_id,
        amount: withdrawal.amount,
        new_balance,
        status: withdrawal.status,
    })
}

/// Approve or reject a pending withdrawal.
///
/// # Errors
///
/// - `WithdrawalNotFound`: no such request
/// - `AlreadyDecided`: the request is no longer pending; nothing changes
/// - `AlreadyProcessed`: the hold is no longer pending, so it cannot be
///   paid out or refunded again
pub async fn decide(
    ledger: &Ledger,
    notifier: &Notifier,
    withdrawal_id: Uuid,
    admin_id: Uuid,
    action: Decision,
    admin_note: Option<&str>,
) -> Result<WithdrawalRequest, AppError> {
    let decided = with_retry(ledger.retry_policy(), "decide_withdrawal", || async move {
        let mut tx = ledger.begin().await?;

        let withdrawal = sqlx::query_as::<_, WithdrawalRequest>(
            "SELECT * FROM withdrawal_requests WHERE id = $1 FOR UPDATE",
        )
        .bind(withdrawal_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::WithdrawalNotFound)?;

        if withdrawal.status != WithdrawalStatus::Pending {
            return Err(AppError::AlreadyDecided);
        }

        let status = match action {
            Decision::Approve => {
                ledger::settle_hold(&mut tx, withdrawal.ledger_entry_id).await?;
                WithdrawalStatus::Approved
            }
            Decision::Reject => {
                let refund = RefundRequest {
                    account_id: withdrawal.account_id,
                    amount: withdrawal.amount,
                    original_entry_id: withdrawal.ledger_entry_id,
                    reason: "Withdrawal rejected - amount refunded".to_string(),
                };
                ledger::release_hold_tx(&mut tx, &refund).await?;
                WithdrawalStatus::Rejected
            }
        };

        let decided = sqlx::query_as::<_, WithdrawalRequest>(
            r#"
            UPDATE withdrawal_requests
            SET status = $1,
                admin_id = $2,
                admin_note = $3,
                decided_at = $4
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(status)
        .bind(admin_id)
        .bind(admin_note)
        .bind(Utc::now())
        .bind(withdrawal.id)
        .fetch_one(&mut *tx)
        .await?;

        db::commit(tx).await?;
        Ok(decided)
    })
    .await?;

    tracing::info!(
        withdrawal_id = %decided.id,
        admin_id = %admin_id,
        status = ?decided.status,
        "withdrawal decided"
    );

    let notification = match decided.status {
        WithdrawalStatus::Rejected => {
            Notification::withdrawal_rejected(decided.account_id, decided.amount)
        }
        _ => Notification::withdrawal_approved(decided.account_id, decided.amount),
    };
    notifier.enqueue(notification);

    Ok(decided)
}

/// Pending requests, oldest first, for the admin queue.
pub async fn list_pending(pool: &DbPool) -> Result<Vec<WithdrawalRequest>, AppError> {
    let requests = sqlx::query_as::<_, WithdrawalRequest>(
        r#"
        SELECT * FROM withdrawal_requests
        WHERE status = 'pending'
        ORDER BY created_at ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(requests)
}

/// An account's own withdrawal requests, newest first.
pub async fn list_for_account(
    pool: &DbPool,
    account_id: Uuid,
) -> Result<Vec<WithdrawalRequest>, AppError> {
    let requests = sqlx::query_as::<_, WithdrawalRequest>(
        "SELECT * FROM withdrawal_requests WHERE account_id = $1 ORDER BY created_at DESC",
    )
    .bind(account_id)
    .fetch_all(pool)
    .await?;

    Ok(requests)
}

/// Save or replace an account's payout details.
pub async fn save_payout_destination(
    pool: &DbPool,
    account_id: Uuid,
    request: &PayoutDestinationRequest,
) -> Result<PayoutDestination, AppError> {
    request.validate()?;

    let destination = sqlx::query_as::<_, PayoutDestination>(
        r#"
        INSERT INTO payout_destinations (account_id, method, destination, holder_name)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (account_id) DO UPDATE
        SET method = EXCLUDED.method,
            destination = EXCLUDED.destination,
            holder_name = EXCLUDED.holder_name,
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(account_id)
    .bind(request.method)
    .bind(request.destination.trim())
    .bind(request.holder_name.as_deref())
    .fetch_one(pool)
    .await?;

    Ok(destination)
}

pub async fn get_payout_destination(
    pool: &DbPool,
    account_id: Uuid,
) -> Result<Option<PayoutDestination>, AppError> {
    let destination = sqlx::query_as::<_, PayoutDestination>(
        "SELECT * FROM payout_destinations WHERE account_id = $1",
    )
    .bind(account_id)
    .fetch_optional(pool)
    .await?;

    Ok(destination)
}
