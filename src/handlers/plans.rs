//! Plan HTTP handlers.

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
    models::plan::{AccountPlan, Plan, PurchaseResponse},
    services::plan_service,
    state::AppState,
};

/// `GET /api/v1/plans`
pub async fn list_plans(State(state): State<AppState>) -> Result<Json<Vec<Plan>>, AppError> {
    Ok(Json(plan_service::list_plans(&state.pool).await?))
}

/// `GET /api/v1/plans/{id}`
pub async fn get_plan(
    State(state): State<AppState>,
    Path(plan_id): Path<Uuid>,
) -> Result<Json<Plan>, AppError> {
    Ok(Json(plan_service::get_plan(&state.pool, plan_id).await?))
}

/// `GET /api/v1/plans/mine`
pub async fn my_plans(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<AccountPlan>>, AppError> {
    let owned = plan_service::account_plans(&state.pool, auth.account_id()?).await?;
    Ok(Json(owned))
}

/// Buy a plan with the wallet balance.
///
/// # Endpoint
///
/// `POST /api/v1/plans/{id}/purchase`
///
/// # Response
///
/// - **200 OK**: plan bought, balance debited by its price
/// - **404**: plan missing or not on sale
/// - **422**: insufficient balance
/// - **429**: repeated within the duplicate window
pub async fn purchase_plan(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(plan_id): Path<Uuid>,
) -> Result<Json<PurchaseResponse>, AppError> {
    let account_id = auth.account_id()?;
    idempotency::guard(state.idempotency.as_ref(), account_id, "plans.purchase", &plan_id).await?;

    let response = detached(async move {
        plan_service::purchase_plan(&state.ledger, &state.notifier, account_id, plan_id).await
    })
    .await?;

    Ok(Json(response))
}
