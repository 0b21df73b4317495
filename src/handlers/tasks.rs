//! Task HTTP handlers.

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use uuid::Uuid;

use crate::{
    error::AppError,
    handlers::detached,
    idempotency,
    middleware::auth::AuthContext,
    models::task::{CompleteTaskResponse, StartTaskResponse, TaskHistoryEntry, TaskResponse},
    services::task_service,
    state::AppState,
};

/// `GET /api/v1/tasks`
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<TaskResponse>>, AppError> {
    let tasks = task_service::list_tasks(&state.pool, auth.account_id()?).await?;
    Ok(Json(tasks))
}

/// `GET /api/v1/tasks/history`
pub async fn task_history(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<TaskHistoryEntry>>, AppError> {
    let history = task_service::task_history(&state.pool, auth.account_id()?).await?;
    Ok(Json(history))
}

/// `POST /api/v1/tasks/{id}/start`
pub async fn start_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<StartTaskResponse>, AppError> {
    let started = task_service::start_task(&state.pool, auth.account_id()?, task_id).await?;
    Ok(Json(started))
}

/// `POST /api/v1/tasks/completions/{id}/complete`
pub async fn complete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(completion_id): Path<Uuid>,
) -> Result<Json<CompleteTaskResponse>, AppError> {
    let account_id = auth.account_id()?;
    let guard = state.idempotency.as_ref();
    idempotency::guard(guard, account_id, "tasks.complete", &completion_id).await?;

    let response = detached(async move {
        task_service::complete_task(&state.ledger, &state.notifier, account_id, completion_id)
            .await
    })
    .await?;

    Ok(Json(response))
}
