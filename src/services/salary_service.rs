//! Monthly salary payouts.
//!
//! Who qualifies and for how much is decided by the referral/manager tier
//! component. This service records a precomputed amount as a
//! `referral_bonus` credit, at most once per account and month.

use uuid::Uuid;

use crate::{
    db,
    error::AppError,
    models::{
        ledger::{CreditRequest, EntryKind},
        notification::Notification,
        salary::{SalaryPayout, SalaryPayoutRequest},
    },
    services::{
        ledger::{self, Ledger},
        notification_service::Notifier,
        retry::with_retry,
    },
};

/// Pay one account's salary for a period.
///
/// # Errors
///
/// - `InvalidAmount` / `InvalidRequest`: bad amount or period
/// - `AccountNotFound`: account doesn't exist
/// - `AlreadyProcessed`: this period was already paid
pub async fn pay_salary(
    ledger: &Ledger,
    notifier: &Notifier,
    admin_id: Uuid,
    request: &SalaryPayoutRequest,
) -> Result<SalaryPayout, AppError> {
    request.validate()?;

    let credit = CreditRequest {
        account_id: request.account_id,
        amount: request.amount,
        kind: EntryKind::ReferralBonus,
        description: format!("Monthly salary for {}", request.period),
        reference_id: Some(format!("salary:{}", request.period)),
    };
    let credit = &credit;

    let payout = with_retry(ledger.retry_policy(), "pay_salary", || async move {
        let mut tx = ledger.begin().await?;

        let entry = ledger::credit_tx(&mut tx, credit).await?;

        let payout = sqlx::query_as::<_, SalaryPayout>(
            r#"
            INSERT INTO salary_payouts (account_id, period, amount, ledger_entry_id, paid_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(request.account_id)
        .bind(&request.period)
        .bind(entry.amount)
        .bind(entry.id)
        .bind(admin_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::from)
        .map_err(|e| {
            if e.is_unique_violation() {
                AppError::AlreadyProcessed
            } else {
                e
            }
        })?;

        db::commit(tx).await?;
        Ok(payout)
    })
    .await?;

    tracing::info!(
        account_id = %payout.account_id,
        period = %payout.period,
        amount = %payout.amount,
        "salary paid"
    );
    notifier.enqueue(Notification::salary_paid(payout.account_id, &payout.period, payout.amount));

    Ok(payout)
}
