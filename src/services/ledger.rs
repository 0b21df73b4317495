//! Balance mutator - the only code that changes an account balance.
//!
//! This service handles:
//! - Locking the account row (`SELECT ... FOR UPDATE`)
//! - Validating the non-negative balance invariant
//! - Writing the new balance and counters
//! - Appending the ledger entry recording `balance_before` / `balance_after`
//!
//! # Atomicity Guarantees
//!
//! The `*_tx` functions run on a connection that is already inside a
//! transaction, so orchestrators (withdrawals, payments, tasks, plans) can
//! combine a balance change with their own side-table writes and commit
//! both together. [`Ledger::credit`], [`Ledger::debit`] and
//! [`Ledger::refund`] wrap a single mutation in its own unit of work with
//! bounded retries.
//!
//! The row lock is taken by PostgreSQL, not by this process, so mutations on
//! one account serialize across every server instance while different
//! accounts proceed in parallel.

use std::time::Duration;

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    db::{self, DbPool, UnitOfWork},
    error::AppError,
    models::{
        account::Account,
        ledger::{
            CreditRequest, DebitRequest, Direction, EntryKind, EntryStatus, LedgerEntry,
            RefundRequest,
        },
    },
    money::Money,
    services::retry::{RetryPolicy, with_retry},
};

/// Handle on the ledger store: a pool plus the contention policy every unit
/// of work runs under.
#[derive(Debug, Clone)]
pub struct Ledger {
    pool: DbPool,
    lock_timeout: Duration,
    retry: RetryPolicy,
}

impl Ledger {
    pub fn new(pool: DbPool, lock_timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            pool,
            lock_timeout,
            retry,
        }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Open a unit of work with the configured lock wait bound.
    pub async fn begin(&self) -> Result<UnitOfWork, AppError> {
        db::begin(&self.pool, self.lock_timeout).await
    }

    /// Credit an account in its own unit of work.
    pub async fn credit(&self, request: &CreditRequest) -> Result<LedgerEntry, AppError> {
        with_retry(&self.retry, "credit", || async move {
            let mut tx = self.begin().await?;
            let entry = credit_tx(&mut tx, request).await?;
            db::commit(tx).await?;
            Ok(entry)
        })
        .await
    }

    /// Debit an account in its own unit of work.
    pub async fn debit(&self, request: &DebitRequest) -> Result<LedgerEntry, AppError> {
        with_retry(&self.retry, "debit", || async move {
            let mut tx = self.begin().await?;
            let entry = debit_tx(&mut tx, request).await?;
            db::commit(tx).await?;
            Ok(entry)
        })
        .await
    }

    /// Reverse a debit in its own unit of work.
    pub async fn refund(&self, request: &RefundRequest) -> Result<LedgerEntry, AppError> {
        with_retry(&self.retry, "refund", || async move {
            let mut tx = self.begin().await?;
            let entry = refund_tx(&mut tx, request).await?;
            db::commit(tx).await?;
            Ok(entry)
        })
        .await
    }
}

/// Fields of a ledger row about to be appended.
struct NewEntry<'a> {
    account_id: Uuid,
    kind: EntryKind,
    amount: Money,
    balance_before: Money,
    balance_after: Money,
    status: EntryStatus,
    description: &'a str,
    reference_id: Option<&'a str>,
}

/// Credit (add money to) an account inside the caller's transaction.
///
/// # Process
///
/// 1. Validate amount and kind
/// 2. Lock the account row
/// 3. Write the new balance (and `total_earned` for earning kinds)
/// 4. Append a `success` ledger entry
///
/// # Errors
///
/// - `InvalidAmount`: amount is zero
/// - `InvalidRequest`: `kind` does not add money, or is `refund`
/// - `AccountNotFound`: account doesn't exist
/// - `LockTimeout`: another transaction held the row too long
pub async fn credit_tx(
    conn: &mut PgConnection,
    request: &CreditRequest,
) -> Result<LedgerEntry, AppError> {
    let amount = request.amount.ensure_positive()?;
    if request.kind.direction() != Direction::Credit || request.kind == EntryKind::Refund {
        return Err(AppError::InvalidRequest(format!(
            "{:?} cannot be credited directly",
            request.kind
        )));
    }

    let account = lock_account(conn, request.account_id).await?;
    let balance_after = account
        .balance
        .checked_add(amount)
        .ok_or_else(|| AppError::InvalidAmount("Amount too large".to_string()))?;
    let earned = if request.kind.is_earning() {
        amount
    } else {
        Money::ZERO
    };

    sqlx::query(
        r#"
        UPDATE accounts
        SET balance = $1,
            total_earned = total_earned + $2,
            updated_at = NOW()
        WHERE id = $3
        "#,
    )
    .bind(balance_after)
    .bind(earned)
    .bind(account.id)
    .execute(&mut *conn)
    .await?;

    let entry = insert_entry(
        conn,
        NewEntry {
            account_id: account.id,
            kind: request.kind,
            amount,
            balance_before: account.balance,
            balance_after,
            status: request.kind.initial_status(),
            description: &request.description,
            reference_id: request.reference_id.as_deref(),
        },
    )
    .await?;

    tracing::debug!(
        account_id = %account.id,
        entry_id = %entry.id,
        kind = ?entry.kind,
        amount = %amount,
        "credited"
    );

    Ok(entry)
}

/// Debit (remove money from) an account inside the caller's transaction.
///
/// A `withdrawal` debit is written as `pending` (the funds are held until an
/// admin decides) and raises `total_withdrawn` immediately. A
/// `plan_purchase` debit is final and written as `success`.
///
/// # Errors
///
/// - `InvalidAmount`: amount is zero
/// - `InvalidRequest`: `kind` does not remove money
/// - `AccountNotFound`: account doesn't exist
/// - `InsufficientFunds`: amount exceeds the locked balance; the caller's
///   transaction must not be committed
pub async fn debit_tx(
    conn: &mut PgConnection,
    request: &DebitRequest,
) -> Result<LedgerEntry, AppError> {
    let amount = request.amount.ensure_positive()?;
    if request.kind.direction() != Direction::Debit {
        return Err(AppError::InvalidRequest(format!(
            "{:?} cannot be debited",
            request.kind
        )));
    }

    let account = lock_account(conn, request.account_id).await?;
    let balance_after = account
        .balance
        .checked_sub(amount)
        .ok_or(AppError::InsufficientFunds)?;
    let withdrawn = if request.kind == EntryKind::Withdrawal {
        amount
    } else {
        Money::ZERO
    };

    sqlx::query(
        r#"
        UPDATE accounts
        SET balance = $1,
            total_withdrawn = total_withdrawn + $2,
            updated_at = NOW()
        WHERE id = $3
        "#,
    )
    .bind(balance_after)
    .bind(withdrawn)
    .bind(account.id)
    .execute(&mut *conn)
    .await?;

    let entry = insert_entry(
        conn,
        NewEntry {
            account_id: account.id,
            kind: request.kind,
            amount,
            balance_before: account.balance,
            balance_after,
            status: request.kind.initial_status(),
            description: &request.description,
            reference_id: request.reference_id.as_deref(),
        },
    )
    .await?;

    tracing::debug!(
        account_id = %account.id,
        entry_id = %entry.id,
        kind = ?entry.kind,
        amount = %amount,
        "debited"
    );

    Ok(entry)
}

/// Reverse a debit inside the caller's transaction.
///
/// Re-credits `amount`, marks the original entry `failed`, and appends a
/// `refund` entry whose `reference_id` is the original entry's id. Refunding
/// a plan purchase also deactivates the plan it bought.
///
/// The original must be a debit owned by the account that is either still
/// pending (a withdrawal hold) or a completed plan purchase. The refund
/// amount must equal the original amount. A hold that belongs to a
/// withdrawal request awaiting a decision can only be released by rejecting
/// that request.
///
/// # Errors
///
/// - `UnknownReference`: original entry missing, owned by another account,
///   or not a debit
/// - `AlreadyProcessed`: original already refunded or already paid out
/// - `InvalidAmount`: amount differs from the original
/// - `InvalidRequest`: the hold is waiting on a withdrawal decision
pub async fn refund_tx(
    conn: &mut PgConnection,
    request: &RefundRequest,
) -> Result<LedgerEntry, AppError> {
    reverse_debit(conn, request, HoldRelease::Refuse).await
}

/// Refund a withdrawal hold as part of rejecting its request.
pub(crate) async fn release_hold_tx(
    conn: &mut PgConnection,
    request: &RefundRequest,
) -> Result<LedgerEntry, AppError> {
    reverse_debit(conn, request, HoldRelease::Decision).await
}

/// Whether a hold tied to a pending withdrawal request may be reversed.
#[derive(Clone, Copy, PartialEq, Eq)]
enum HoldRelease {
    Refuse,
    Decision,
}

async fn reverse_debit(
    conn: &mut PgConnection,
    request: &RefundRequest,
    release: HoldRelease,
) -> Result<LedgerEntry, AppError> {
    let amount = request.amount.ensure_positive()?;

    let account = lock_account(conn, request.account_id).await?;

    let original = sqlx::query_as::<_, LedgerEntry>(
        "SELECT * FROM ledger_entries WHERE id = $1 FOR UPDATE",
    )
    .bind(request.original_entry_id)
    .fetch_optional(&mut *conn)
    .await?
    .filter(|entry| entry.account_id == account.id)
    .ok_or_else(|| {
        AppError::UnknownReference(format!("ledger entry {}", request.original_entry_id))
    })?;

    if original.kind.direction() != Direction::Debit {
        return Err(AppError::UnknownReference(format!(
            "ledger entry {} is not a debit",
            original.id
        )));
    }
    match (original.kind, original.status) {
        (_, EntryStatus::Pending) | (EntryKind::PlanPurchase, EntryStatus::Success) => {}
        _ => return Err(AppError::AlreadyProcessed),
    }
    if original.amount != amount {
        return Err(AppError::InvalidAmount(format!(
            "Refund of {} does not match original amount {}",
            amount, original.amount
        )));
    }

    if original.kind == EntryKind::Withdrawal && release == HoldRelease::Refuse {
        let awaiting_decision: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM withdrawal_requests
                WHERE ledger_entry_id = $1 AND status = 'pending'
            )
            "#,
        )
        .bind(original.id)
        .fetch_one(&mut *conn)
        .await?;

        if awaiting_decision {
            return Err(AppError::InvalidRequest(
                "Withdrawal is awaiting an admin decision".to_string(),
            ));
        }
    }

    let balance_after = account
        .balance
        .checked_add(amount)
        .ok_or_else(|| AppError::InvalidAmount("Amount too large".to_string()))?;

    sqlx::query("UPDATE accounts SET balance = $1, updated_at = NOW() WHERE id = $2")
        .bind(balance_after)
        .bind(account.id)
        .execute(&mut *conn)
        .await?;

    sqlx::query("UPDATE ledger_entries SET status = 'failed' WHERE id = $1")
        .bind(original.id)
        .execute(&mut *conn)
        .await?;

    if original.kind == EntryKind::PlanPurchase {
        sqlx::query("UPDATE account_plans SET is_active = FALSE WHERE ledger_entry_id = $1")
            .bind(original.id)
            .execute(&mut *conn)
            .await?;
    }

    let original_ref = original.id.to_string();
    let entry = insert_entry(
        conn,
        NewEntry {
            account_id: account.id,
            kind: EntryKind::Refund,
            amount,
            balance_before: account.balance,
            balance_after,
            status: EntryStatus::Success,
            description: &request.reason,
            reference_id: Some(&original_ref),
        },
    )
    .await?;

    tracing::info!(
        account_id = %account.id,
        original_entry_id = %original.id,
        refund_entry_id = %entry.id,
        amount = %amount,
        "refunded"
    );

    Ok(entry)
}

/// Settle a pending withdrawal hold as paid out.
///
/// Only a `pending` entry moves; anything else was already refunded or
/// settled and yields `AlreadyProcessed`.
pub(crate) async fn settle_hold(conn: &mut PgConnection, entry_id: Uuid) -> Result<(), AppError> {
    let updated = sqlx::query(
        "UPDATE ledger_entries SET status = 'success' WHERE id = $1 AND status = 'pending'",
    )
    .bind(entry_id)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(AppError::AlreadyProcessed);
    }
    Ok(())
}

/// Lock the account row for the rest of the transaction.
async fn lock_account(conn: &mut PgConnection, account_id: Uuid) -> Result<Account, AppError> {
    sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1 FOR UPDATE")
        .bind(account_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::AccountNotFound)
}

async fn insert_entry(
    conn: &mut PgConnection,
    entry: NewEntry<'_>,
) -> Result<LedgerEntry, AppError> {
    let entry = sqlx::query_as::<_, LedgerEntry>(
        r#"
        INSERT INTO ledger_entries (
            account_id,
            kind,
            amount,
            balance_before,
            balance_after,
            status,
            description,
            reference_id
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(entry.account_id)
    .bind(entry.kind)
    .bind(entry.amount)
    .bind(entry.balance_before)
    .bind(entry.balance_after)
    .bind(entry.status)
    .bind(entry.description)
    .bind(entry.reference_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(entry)
}

/// Read an account without locking it.
pub async fn get_account(pool: &DbPool, account_id: Uuid) -> Result<Account, AppError> {
    sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
        .bind(account_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::AccountNotFound)
}

/// Get one of an account's ledger entries by id.
pub async fn get_entry(
    pool: &DbPool,
    account_id: Uuid,
    entry_id: Uuid,
) -> Result<Option<LedgerEntry>, AppError> {
    let entry = sqlx::query_as::<_, LedgerEntry>(
        "SELECT * FROM ledger_entries WHERE id = $1 AND account_id = $2",
    )
    .bind(entry_id)
    .bind(account_id)
    .fetch_optional(pool)
    .await?;

    Ok(entry)
}

/// A page of an account's entries, newest first, plus the total count.
pub async fn history(
    pool: &DbPool,
    account_id: Uuid,
    limit: u32,
    offset: u64,
) -> Result<(Vec<LedgerEntry>, i64), AppError> {
    let entries = sqlx::query_as::<_, LedgerEntry>(
        r#"
        SELECT * FROM ledger_entries
        WHERE account_id = $1
        ORDER BY sequence DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(account_id)
    .bind(i64::from(limit))
    .bind(offset as i64)
    .fetch_all(pool)
    .await?;

    let total: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM ledger_entries WHERE account_id = $1")
            .bind(account_id)
            .fetch_one(pool)
            .await?;

    Ok((entries, total))
}

/// Every entry for an account in commit order.
pub async fn entries_in_order(
    pool: &DbPool,
    account_id: Uuid,
) -> Result<Vec<LedgerEntry>, AppError> {
    let entries = sqlx::query_as::<_, LedgerEntry>(
        "SELECT * FROM ledger_entries WHERE account_id = $1 ORDER BY sequence ASC",
    )
    .bind(account_id)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}
