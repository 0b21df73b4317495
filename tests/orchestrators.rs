//! Task rewards, plan purchases and salary payouts on top of the ledger.

mod common;

use common::{admin, balance, funded_account, ledger, money, notifier};
use sqlx::PgPool;
use uuid::Uuid;
use wallet_ledger::{
    error::AppError,
    models::{
        ledger::{EntryKind, EntryStatus, RefundRequest},
        plan::PlanRequest,
        salary::SalaryPayoutRequest,
        task::CompletionStatus,
    },
    money::Money,
    services::{
        ledger::{entries_in_order, get_account},
        plan_service, salary_service, task_service,
    },
};

async fn task(pool: &PgPool, title: &str, reward: &str, max_completions: i32) -> Uuid {
    sqlx::query_scalar(
        "INSERT INTO tasks (title, reward, max_completions) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(title)
    .bind(money(reward))
    .bind(max_completions)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn plan(pool: &PgPool, name: &str, price: &str, daily_profit: &str) -> Uuid {
    sqlx::query_scalar(
        "INSERT INTO plans (name, price, daily_profit, duration_days) VALUES ($1, $2, $3, 30) RETURNING id",
    )
    .bind(name)
    .bind(money(price))
    .bind(money(daily_profit))
    .fetch_one(pool)
    .await
    .unwrap()
}

#[sqlx::test]
async fn completing_a_task_pays_its_reward_once(pool: PgPool) {
    let ledger = ledger(&pool);
    let account = funded_account(&ledger, "0").await;
    let task_id = task(&pool, "Watch video", "15.50", 10).await;

    let started = task_service::start_task(&pool, account, task_id).await.unwrap();
    assert_eq!(started.reward, money("15.50"));

    let done = task_service::complete_task(&ledger, &notifier(), account, started.completion_id)
        .await
        .unwrap();
    assert_eq!(done.new_balance, money("15.50"));

    let again =
        task_service::complete_task(&ledger, &notifier(), account, started.completion_id).await;
    assert!(matches!(again, Err(AppError::AlreadyProcessed)));

    let restart = task_service::start_task(&pool, account, task_id).await;
    assert!(matches!(restart, Err(AppError::AlreadyProcessed)));

    let stored = get_account(&pool, account).await.unwrap();
    assert_eq!(stored.balance, money("15.50"));
    assert_eq!(stored.total_earned, money("15.50"));

    let listed = task_service::list_tasks(&pool, account).await.unwrap();
    assert!(listed.iter().any(|t| t.id == task_id && t.is_completed));

    let entries = entries_in_order(&pool, account).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, EntryKind::TaskReward);
}

#[sqlx::test]
async fn two_starts_of_one_task_pay_once(pool: PgPool) {
    let ledger = ledger(&pool);
    let account = funded_account(&ledger, "0").await;
    let task_id = task(&pool, "Survey", "10.00", 10).await;

    let first = task_service::start_task(&pool, account, task_id).await.unwrap();
    let second = task_service::start_task(&pool, account, task_id).await.unwrap();

    task_service::complete_task(&ledger, &notifier(), account, first.completion_id)
        .await
        .unwrap();
    let duplicate =
        task_service::complete_task(&ledger, &notifier(), account, second.completion_id).await;
    assert!(matches!(duplicate, Err(AppError::AlreadyProcessed)));

    assert_eq!(balance(&pool, account).await, money("10.00"));
}

#[sqlx::test]
async fn completions_belong_to_their_account(pool: PgPool) {
    let ledger = ledger(&pool);
    let owner = funded_account(&ledger, "0").await;
    let other = funded_account(&ledger, "0").await;
    let task_id = task(&pool, "Survey", "10.00", 10).await;

    let started = task_service::start_task(&pool, owner, task_id).await.unwrap();
    let stolen =
        task_service::complete_task(&ledger, &notifier(), other, started.completion_id).await;
    assert!(matches!(stolen, Err(AppError::TaskNotFound)));
    assert_eq!(balance(&pool, other).await, Money::ZERO);

    let missing = task_service::start_task(&pool, owner, Uuid::new_v4()).await;
    assert!(matches!(missing, Err(AppError::TaskNotFound)));
}

#[sqlx::test]
async fn full_tasks_are_hidden_and_cannot_start(pool: PgPool) {
    let ledger = ledger(&pool);
    let first = funded_account(&ledger, "0").await;
    let second = funded_account(&ledger, "0").await;
    let task_id = task(&pool, "Limited", "5.00", 1).await;

    let started = task_service::start_task(&pool, first, task_id).await.unwrap();
    task_service::complete_task(&ledger, &notifier(), first, started.completion_id)
        .await
        .unwrap();

    let listed = task_service::list_tasks(&pool, second).await.unwrap();
    assert!(listed.iter().all(|t| t.id != task_id));
    assert!(matches!(
        task_service::start_task(&pool, second, task_id).await,
        Err(AppError::TaskNotFound)
    ));
}

#[sqlx::test]
async fn purchase_debits_price_and_records_plan(pool: PgPool) {
    let ledger = ledger(&pool);
    let account = funded_account(&ledger, "1450.00").await;
    let plan_id = plan(&pool, "Supreme", "1450.00", "48.00").await;

    let bought = plan_service::purchase_plan(&ledger, &notifier(), account, plan_id)
        .await
        .unwrap();
    assert_eq!(bought.new_balance, Money::ZERO);
    assert_eq!(bought.plan_name, "Supreme");
    assert_eq!(bought.daily_profit, money("48.00"));

    let owned = plan_service::account_plans(&pool, account).await.unwrap();
    assert_eq!(owned.len(), 1);
    assert_eq!(owned[0].purchase_price, money("1450.00"));

    let entries = entries_in_order(&pool, account).await.unwrap();
    let purchase = entries.last().unwrap();
    assert_eq!(purchase.kind, EntryKind::PlanPurchase);
    assert_eq!(purchase.status, EntryStatus::Success);
    assert_eq!(owned[0].ledger_entry_id, purchase.id);

    let broke = plan_service::purchase_plan(&ledger, &notifier(), account, plan_id).await;
    assert!(matches!(broke, Err(AppError::InsufficientFunds)));
    assert_eq!(plan_service::account_plans(&pool, account).await.unwrap().len(), 1);
}

#[sqlx::test]
async fn inactive_plans_cannot_be_bought(pool: PgPool) {
    let ledger = ledger(&pool);
    let account = funded_account(&ledger, "1000.00").await;
    let plan_id = plan(&pool, "Retired", "100.00", "1.00").await;
    sqlx::query("UPDATE plans SET is_active = false WHERE id = $1")
        .bind(plan_id)
        .execute(&pool)
        .await
        .unwrap();

    let result = plan_service::purchase_plan(&ledger, &notifier(), account, plan_id).await;
    assert!(matches!(result, Err(AppError::PlanNotFound)));
    assert!(plan_service::list_plans(&pool).await.unwrap().is_empty());
    assert_eq!(balance(&pool, account).await, money("1000.00"));
}

#[sqlx::test]
async fn salary_is_paid_once_per_period(pool: PgPool) {
    let ledger = ledger(&pool);
    let admin = admin(&pool).await;
    let account = funded_account(&ledger, "0").await;

    let request = SalaryPayoutRequest {
        account_id: account,
        period: "2025-03".to_string(),
        amount: money("70000.00"),
    };
    let payout = salary_service::pay_salary(&ledger, &notifier(), admin, &request)
        .await
        .unwrap();
    assert_eq!(payout.paid_by, Some(admin));

    let again = salary_service::pay_salary(&ledger, &notifier(), admin, &request).await;
    assert!(matches!(again, Err(AppError::AlreadyProcessed)));

    let next_month = SalaryPayoutRequest {
        period: "2025-04".to_string(),
        ..request.clone()
    };
    salary_service::pay_salary(&ledger, &notifier(), admin, &next_month)
        .await
        .unwrap();

    let stored = get_account(&pool, account).await.unwrap();
    assert_eq!(stored.balance, money("140000.00"));
    assert_eq!(stored.total_earned, money("140000.00"));

    let entries = entries_in_order(&pool, account).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.kind == EntryKind::ReferralBonus));
}

#[sqlx::test]
async fn completions_stop_at_task_capacity(pool: PgPool) {
    let ledger = ledger(&pool);
    let first = funded_account(&ledger, "0").await;
    let second = funded_account(&ledger, "0").await;
    let task_id = task(&pool, "One slot", "5.00", 1).await;

    let a = task_service::start_task(&pool, first, task_id).await.unwrap();
    let b = task_service::start_task(&pool, second, task_id).await.unwrap();

    task_service::complete_task(&ledger, &notifier(), first, a.completion_id)
        .await
        .unwrap();
    let late = task_service::complete_task(&ledger, &notifier(), second, b.completion_id).await;
    assert!(matches!(late, Err(AppError::TaskNotFound)));

    let completions: i32 =
        sqlx::query_scalar("SELECT current_completions FROM tasks WHERE id = $1")
            .bind(task_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(completions, 1);
    assert_eq!(balance(&pool, second).await, Money::ZERO);
}

#[sqlx::test]
async fn task_history_lists_started_and_completed(pool: PgPool) {
    let ledger = ledger(&pool);
    let account = funded_account(&ledger, "0").await;
    let other = funded_account(&ledger, "0").await;
    let survey = task(&pool, "Survey", "10.00", 10).await;
    let video = task(&pool, "Watch video", "2.50", 10).await;

    let done = task_service::start_task(&pool, account, survey).await.unwrap();
    task_service::complete_task(&ledger, &notifier(), account, done.completion_id)
        .await
        .unwrap();
    task_service::start_task(&pool, account, video).await.unwrap();
    task_service::start_task(&pool, other, video).await.unwrap();

    let history = task_service::task_history(&pool, account).await.unwrap();
    assert_eq!(history.len(), 2);

    let survey_row = history.iter().find(|h| h.task_id == survey).unwrap();
    assert_eq!(survey_row.status, CompletionStatus::Completed);
    assert_eq!(survey_row.title, "Survey");
    assert!(survey_row.completed_at.is_some());

    let video_row = history.iter().find(|h| h.task_id == video).unwrap();
    assert_eq!(video_row.status, CompletionStatus::Started);
    assert_eq!(video_row.reward, money("2.50"));
}

fn plan_request(name: &str, price: &str) -> PlanRequest {
    PlanRequest {
        name: name.to_string(),
        description: Some("Daily returns".to_string()),
        price: money(price),
        daily_profit: money("3.30"),
        duration_days: 30,
        sort_order: 1,
        is_active: true,
    }
}

#[sqlx::test]
async fn plans_are_managed_without_losing_purchases(pool: PgPool) {
    let ledger = ledger(&pool);
    let account = funded_account(&ledger, "500.00").await;

    let created = plan_service::create_plan(&pool, &plan_request("Basic", "100.00"))
        .await
        .unwrap();
    assert!(created.is_active);
    assert_eq!(plan_service::get_plan(&pool, created.id).await.unwrap().name, "Basic");

    plan_service::purchase_plan(&ledger, &notifier(), account, created.id)
        .await
        .unwrap();

    let update = plan_request("Basic+", "150.00");
    let repriced = plan_service::update_plan(&pool, created.id, &update)
        .await
        .unwrap();
    assert_eq!(repriced.price, money("150.00"));

    let owned = plan_service::account_plans(&pool, account).await.unwrap();
    assert_eq!(owned[0].purchase_price, money("100.00"));

    plan_service::deactivate_plan(&pool, created.id).await.unwrap();
    assert!(matches!(
        plan_service::get_plan(&pool, created.id).await,
        Err(AppError::PlanNotFound)
    ));
    assert!(plan_service::list_plans(&pool).await.unwrap().is_empty());
    assert_eq!(plan_service::account_plans(&pool, account).await.unwrap().len(), 1);

    assert!(matches!(
        plan_service::deactivate_plan(&pool, Uuid::new_v4()).await,
        Err(AppError::PlanNotFound)
    ));
    let invalid = plan_service::create_plan(&pool, &plan_request(" ", "100.00")).await;
    assert!(matches!(invalid, Err(AppError::InvalidRequest(_))));
}

#[sqlx::test]
async fn refunding_a_purchase_deactivates_the_plan(pool: PgPool) {
    let ledger = ledger(&pool);
    let account = funded_account(&ledger, "1450.00").await;
    let plan_id = plan(&pool, "Supreme", "1450.00", "48.00").await;

    plan_service::purchase_plan(&ledger, &notifier(), account, plan_id)
        .await
        .unwrap();
    let owned = plan_service::account_plans(&pool, account).await.unwrap();

    ledger
        .refund(&RefundRequest {
            account_id: account,
            amount: money("1450.00"),
            original_entry_id: owned[0].ledger_entry_id,
            reason: "Plan cancelled".to_string(),
        })
        .await
        .unwrap();

    let owned = plan_service::account_plans(&pool, account).await.unwrap();
    assert!(!owned[0].is_active);
    assert_eq!(balance(&pool, account).await, money("1450.00"));
}
