//! Task rewards.
//!
//! A task is started first, which fixes the reward on a `task_completions`
//! row, and completed later. Completion credits the reward and closes the
//! row in one transaction; the row lock plus the partial unique index on
//! completed rows keep a reward from being paid twice.

use uuid::Uuid;

use crate::{
    db::{self, DbPool},
    error::AppError,
    models::{
        ledger::{CreditRequest, EntryKind},
        notification::Notification,
        task::{
            CompleteTaskResponse, CompletionStatus, StartTaskResponse, Task, TaskCompletion,
            TaskHistoryEntry, TaskResponse,
        },
    },
    services::{
        ledger::{self, Ledger},
        notification_service::Notifier,
        retry::with_retry,
    },
};

/// Active, unexpired tasks that still have capacity, highest priority first.
pub async fn list_tasks(pool: &DbPool, account_id: Uuid) -> Result<Vec<TaskResponse>, AppError> {
    let tasks = sqlx::query_as::<_, Task>(
        r#"
        SELECT * FROM tasks
        WHERE is_active
          AND current_completions < max_completions
          AND (expires_at IS NULL OR expires_at > NOW())
        ORDER BY priority DESC, created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    let completed: Vec<Uuid> = sqlx::query_scalar(
        "SELECT task_id FROM task_completions WHERE account_id = $1 AND status = 'completed'",
    )
    .bind(account_id)
    .fetch_all(pool)
    .await?;

    let tasks = tasks
        .into_iter()
        .map(|task| TaskResponse {
            is_completed: completed.contains(&task.id),
            id: task.id,
            title: task.title,
            description: task.description,
            reward: task.reward,
        })
        .collect();

    Ok(tasks)
}

/// Most recent history rows returned to a caller.
const HISTORY_LIMIT: i64 = 50;

/// An account's started and completed tasks, most recent first.
pub async fn task_history(
    pool: &DbPool,
    account_id: Uuid,
) -> Result<Vec<TaskHistoryEntry>, AppError> {
    let history = sqlx::query_as::<_, TaskHistoryEntry>(
        r#"
        SELECT c.id AS completion_id,
               c.task_id,
               t.title,
               c.reward,
               c.status,
               c.started_at,
               c.completed_at
        FROM task_completions c
        JOIN tasks t ON t.id = c.task_id
        WHERE c.account_id = $1
        ORDER BY c.started_at DESC
        LIMIT $2
        "#,
    )
    .bind(account_id)
    .bind(HISTORY_LIMIT)
    .fetch_all(pool)
    .await?;

    Ok(history)
}

/// Record that an account started a task.
///
/// # Errors
///
/// - `TaskNotFound`: missing, inactive, expired or full
/// - `AlreadyProcessed`: the account already completed this task
pub async fn start_task(
    pool: &DbPool,
    account_id: Uuid,
    task_id: Uuid,
) -> Result<StartTaskResponse, AppError> {
    let task = sqlx::query_as::<_, Task>(
        r#"
        SELECT * FROM tasks
        WHERE id = $1
          AND is_active
          AND current_completions < max_completions
          AND (expires_at IS NULL OR expires_at > NOW())
        "#,
    )
    .bind(task_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::TaskNotFound)?;

    let already_done: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM task_completions
            WHERE account_id = $1 AND task_id = $2 AND status = 'completed'
        )
        "#,
    )
    .bind(account_id)
    .bind(task_id)
    .fetch_one(pool)
    .await?;

    if already_done {
        return Err(AppError::AlreadyProcessed);
    }

    let completion = sqlx::query_as::<_, TaskCompletion>(
        r#"
        INSERT INTO task_completions (account_id, task_id, reward)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(account_id)
    .bind(task.id)
    .bind(task.reward)
    .fetch_one(pool)
    .await?;

    tracing::info!(
        account_id = %account_id,
        task_id = %task.id,
        completion_id = %completion.id,
        "task started"
    );

    Ok(StartTaskResponse {
        completion_id: completion.id,
        task_id: task.id,
        title: task.title,
        reward: completion.reward,
    })
}

/// Complete a started task and credit its reward.
///
/// Lock order is completion row, task row, account row.
///
/// # Errors
///
/// - `TaskNotFound`: no such completion for this account, or the task was
///   deactivated, expired or filled up since it was started
/// - `AlreadyProcessed`: already completed, here or through another start
///   of the same task
pub async fn complete_task(
    ledger: &Ledger,
    notifier: &Notifier,
    account_id: Uuid,
    completion_id: Uuid,
) -> Result<CompleteTaskResponse, AppError> {
    let (title, entry) = with_retry(ledger.retry_policy(), "complete_task", || async move {
        let mut tx = ledger.begin().await?;

        let completion = sqlx::query_as::<_, TaskCompletion>(
            "SELECT * FROM task_completions WHERE id = $1 AND account_id = $2 FOR UPDATE",
        )
        .bind(completion_id)
        .bind(account_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::TaskNotFound)?;

        if completion.status == CompletionStatus::Completed {
            return Err(AppError::AlreadyProcessed);
        }

        // Capacity is re-checked under the task lock; starts do not reserve it.
        let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1 FOR UPDATE")
            .bind(completion.task_id)
            .fetch_optional(&mut *tx)
            .await?
            .filter(Task::is_available)
            .ok_or(AppError::TaskNotFound)?;
        let title = task.title;

        let credit = CreditRequest {
            account_id,
            amount: completion.reward,
            kind: EntryKind::TaskReward,
            description: format!("Task completed: {title}"),
            reference_id: Some(completion.id.to_string()),
        };
        let entry = ledger::credit_tx(&mut tx, &credit).await?;

        sqlx::query(
            r#"
            UPDATE task_completions
            SET status = 'completed',
                ledger_entry_id = $1,
                completed_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(entry.id)
        .bind(completion.id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)
        .map_err(|e| {
            if e.is_unique_violation() {
                AppError::AlreadyProcessed
            } else {
                e
            }
        })?;

        sqlx::query("UPDATE tasks SET current_completions = current_completions + 1 WHERE id = $1")
            .bind(task.id)
            .execute(&mut *tx)
            .await?;

        db::commit(tx).await?;
        Ok((title, entry))
    })
    .await?;

    tracing::info!(
        account_id = %account_id,
        completion_id = %completion_id,
        entry_id = %entry.id,
        reward = %entry.amount,
        "task rewarded"
    );
    notifier.enqueue(Notification::task_rewarded(account_id, &title, entry.amount));

    Ok(CompleteTaskResponse {
        reward: entry.amount,
        new_balance: entry.balance_after,
        ledger_entry_id: entry.id,
    })
}
