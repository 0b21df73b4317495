//! Plan catalogue and purchases.
//!
//! Plans are never deleted: a purchase keeps a reference to its plan, so
//! removing a plan only takes it off sale.

use uuid::Uuid;

use crate::{
    db::{self, DbPool},
    error::AppError,
    models::{
        ledger::{DebitRequest, EntryKind},
        notification::Notification,
        plan::{AccountPlan, Plan, PlanRequest, PurchaseResponse},
    },
    services::{
        ledger::{self, Ledger},
        notification_service::Notifier,
        retry::with_retry,
    },
};

/// Plans on sale, in display order.
pub async fn list_plans(pool: &DbPool) -> Result<Vec<Plan>, AppError> {
    let plans = sqlx::query_as::<_, Plan>(
        "SELECT * FROM plans WHERE is_active ORDER BY sort_order ASC, price ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(plans)
}

/// A single plan that is on sale.
pub async fn get_plan(pool: &DbPool, plan_id: Uuid) -> Result<Plan, AppError> {
    sqlx::query_as::<_, Plan>("SELECT * FROM plans WHERE id = $1 AND is_active")
        .bind(plan_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::PlanNotFound)
}

/// Put a new plan on sale.
pub async fn create_plan(pool: &DbPool, request: &PlanRequest) -> Result<Plan, AppError> {
    request.validate()?;

    let plan = sqlx::query_as::<_, Plan>(
        r#"
        INSERT INTO plans (name, description, price, daily_profit, duration_days, sort_order)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(request.name.trim())
    .bind(request.description.as_deref())
    .bind(request.price)
    .bind(request.daily_profit)
    .bind(request.duration_days)
    .bind(request.sort_order)
    .fetch_one(pool)
    .await?;

    tracing::info!(plan_id = %plan.id, name = %plan.name, price = %plan.price, "plan created");

    Ok(plan)
}

/// Replace a plan's terms. Plans already bought keep the terms they were
/// bought at.
///
/// # Errors
///
/// - `PlanNotFound`: no such plan, active or not
pub async fn update_plan(
    pool: &DbPool,
    plan_id: Uuid,
    request: &PlanRequest,
) -> Result<Plan, AppError> {
    request.validate()?;

    let plan = sqlx::query_as::<_, Plan>(
        r#"
        UPDATE plans
        SET name = $1,
            description = $2,
            price = $3,
            daily_profit = $4,
            duration_days = $5,
            sort_order = $6,
            is_active = $7
        WHERE id = $8
        RETURNING *
        "#,
    )
    .bind(request.name.trim())
    .bind(request.description.as_deref())
    .bind(request.price)
    .bind(request.daily_profit)
    .bind(request.duration_days)
    .bind(request.sort_order)
    .bind(request.is_active)
    .bind(plan_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::PlanNotFound)?;

    tracing::info!(plan_id = %plan.id, is_active = plan.is_active, "plan updated");

    Ok(plan)
}

/// Take a plan off sale.
pub async fn deactivate_plan(pool: &DbPool, plan_id: Uuid) -> Result<(), AppError> {
    let updated = sqlx::query("UPDATE plans SET is_active = FALSE WHERE id = $1")
        .bind(plan_id)
        .execute(pool)
        .await?
        .rows_affected();

    if updated == 0 {
        return Err(AppError::PlanNotFound);
    }

    tracing::info!(plan_id = %plan_id, "plan taken off sale");
    Ok(())
}

/// Buy a plan: debit its price and record the account plan together.
///
/// # Errors
///
/// - `PlanNotFound`: missing or no longer on sale
/// - `InsufficientFunds`: price exceeds the balance; nothing is written
pub async fn purchase_plan(
    ledger: &Ledger,
    notifier: &Notifier,
    account_id: Uuid,
    plan_id: Uuid,
) -> Result<PurchaseResponse, AppError> {
    let plan = get_plan(ledger.pool(), plan_id).await?;

    let debit = DebitRequest {
        account_id,
        amount: plan.price,
        kind: EntryKind::PlanPurchase,
        description: format!("{} plan purchase", plan.name),
        reference_id: Some(plan.id.to_string()),
    };
    let (debit, plan_ref) = (&debit, &plan);

    let policy = ledger.retry_policy();
    let (owned, new_balance) = with_retry(policy, "purchase_plan", || async move {
        let mut tx = ledger.begin().await?;

        let entry = ledger::debit_tx(&mut tx, debit).await?;

        let owned = sqlx::query_as::<_, AccountPlan>(
            r#"
            INSERT INTO account_plans (
                account_id,
                plan_id,
                ledger_entry_id,
                purchase_price,
                daily_profit,
                total_days
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(account_id)
        .bind(plan_ref.id)
        .bind(entry.id)
        .bind(plan_ref.price)
        .bind(plan_ref.daily_profit)
        .bind(plan_ref.duration_days)
        .fetch_one(&mut *tx)
        .await?;

        db::commit(tx).await?;
        Ok((owned, entry.balance_after))
    })
    .await?;

    tracing::info!(
        account_id = %account_id,
        plan_id = %plan.id,
        account_plan_id = %owned.id,
        price = %plan.price,
        "plan purchased"
    );
    notifier.enqueue(Notification::plan_purchased(account_id, &plan.name, plan.daily_profit));

    Ok(PurchaseResponse {
        account_plan_id: owned.id,
        plan_name: plan.name,
        daily_profit: owned.daily_profit,
        duration_days: owned.total_days,
        new_balance,
    })
}

/// Plans an account owns, newest first.
pub async fn account_plans(
    pool: &DbPool,
    account_id: Uuid,
) -> Result<Vec<AccountPlan>, AppError> {
    let owned = sqlx::query_as::<_, AccountPlan>(
        "SELECT * FROM account_plans WHERE account_id = $1 ORDER BY purchased_at DESC",
    )
    .bind(account_id)
    .fetch_all(pool)
    .await?;

    Ok(owned)
}
