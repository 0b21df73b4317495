//! Task and task completion models.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::money::Money;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub reward: Money,
    pub is_active: bool,
    pub max_completions: i32,
    pub current_completions: i32,
    pub priority: i32,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Active, unexpired and below its completion cap.
    pub fn is_available(&self) -> bool {
        self.is_active
            && self.current_completions < self.max_completions
            && self.expires_at.is_none_or(|at| at > Utc::now())
    }
}

/// Maps to the `task_completion_status` PostgreSQL enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::Type)]
#[sqlx(type_name = "task_completion_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    Started,
    Completed,
}

/// One account's attempt at a task. The reward is fixed when the task is
/// started.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct TaskCompletion {
    pub id: Uuid,
    pub account_id: Uuid,
    pub task_id: Uuid,
    pub reward: Money,
    pub status: CompletionStatus,
    pub ledger_entry_id: Option<Uuid>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// One row of an account's task history.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct TaskHistoryEntry {
    pub completion_id: Uuid,
    pub task_id: Uuid,
    pub title: String,
    pub reward: Money,
    pub status: CompletionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Task listing entry for the caller.
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub reward: Money,
    pub is_completed: bool,
}

#[derive(Debug, Serialize)]
pub struct StartTaskResponse {
    pub completion_id: Uuid,
    pub task_id: Uuid,
    pub title: String,
    pub reward: Money,
}

#[derive(Debug, Serialize)]
pub struct CompleteTaskResponse {
    pub reward: Money,
    pub new_balance: Money,
    pub ledger_entry_id: Uuid,
}
