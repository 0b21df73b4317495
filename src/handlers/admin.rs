//! Admin HTTP handlers. Every handler requires an admin token.
//!
//! - POST /api/v1/admin/accounts
//! - GET  /api/v1/admin/withdrawals
//! - POST /api/v1/admin/withdrawals/{id}/decision
//! - POST /api/v1/admin/salary-payouts
//! - POST /api/v1/admin/plans
//! - PUT  /api/v1/admin/plans/{id}
//! - DELETE /api/v1/admin/plans/{id}

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    handlers::detached,
    middleware::auth::AuthContext,
    models::{
        account::AccountResponse,
        plan::{Plan, PlanRequest},
        salary::{SalaryPayout, SalaryPayoutRequest},
        withdrawal::{DecisionRequest, WithdrawalRequest},
    },
    services::{account_service, plan_service, salary_service, withdrawal_service},
    state::AppState,
};

/// Provision an empty account.
pub async fn open_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<(StatusCode, Json<AccountResponse>), AppError> {
    auth.admin_id()?;
    let account = account_service::open_account(&state.pool).await?;
    Ok((StatusCode::CREATED, Json(account.into())))
}

/// Pending withdrawals, oldest first.
pub async fn list_pending_withdrawals(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<WithdrawalRequest>>, AppError> {
    auth.admin_id()?;
    Ok(Json(withdrawal_service::list_pending(&state.pool).await?))
}

/// Approve or reject a withdrawal.
///
/// # Request Body
///
/// ```json
/// {
///   "action": "reject",
///   "admin_note": "Account details do not match"
/// }
/// ```
///
/// # Response
///
/// - **200 OK**: the decided request
/// - **404**: no such withdrawal
/// - **409**: already decided
pub async fn decide_withdrawal(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(withdrawal_id): Path<Uuid>,
    Json(request): Json<DecisionRequest>,
) -> Result<Json<WithdrawalRequest>, AppError> {
    let admin_id = auth.admin_id()?;

    let decided = detached(async move {
        withdrawal_service::decide(
            &state.ledger,
            &state.notifier,
            withdrawal_id,
            admin_id,
            request.action,
            request.admin_note.as_deref(),
        )
        .await
    })
    .await?;

    Ok(Json(decided))
}

/// Credit a precomputed monthly salary.
pub async fn pay_salary(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<SalaryPayoutRequest>,
) -> Result<(StatusCode, Json<SalaryPayout>), AppError> {
    let admin_id = auth.admin_id()?;

    let payout = detached(async move {
        salary_service::pay_salary(&state.ledger, &state.notifier, admin_id, &request).await
    })
    .await?;

    Ok((StatusCode::CREATED, Json(payout)))
}

/// Put a new plan on sale.
///
/// # Response
///
/// - **201 Created**: the stored plan
/// - **400**: missing name, non-positive price or duration
pub async fn create_plan(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<PlanRequest>,
) -> Result<(StatusCode, Json<Plan>), AppError> {
    auth.admin_id()?;
    let plan = plan_service::create_plan(&state.pool, &request).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

pub async fn update_plan(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(plan_id): Path<Uuid>,
    Json(request): Json<PlanRequest>,
) -> Result<Json<Plan>, AppError> {
    auth.admin_id()?;
    Ok(Json(plan_service::update_plan(&state.pool, plan_id, &request).await?))
}

/// Take a plan off sale. Owned plans are unaffected.
pub async fn delete_plan(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(plan_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    auth.admin_id()?;
    plan_service::deactivate_plan(&state.pool, plan_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
