//! Wallet HTTP handlers.
//!
//! - GET  /api/v1/wallet/balance
//! - GET  /api/v1/wallet/transactions
//! - GET  /api/v1/wallet/transactions/{id}
//! - POST /api/v1/wallet/withdraw
//! - GET  /api/v1/wallet/withdrawals
//! - GET  /api/v1/wallet/payout-destination
//! - PUT  /api/v1/wallet/payout-destination

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use uuid::Uuid;

use crate::{
    error::AppError,
    handlers::detached,
    idempotency,
    middleware::auth::AuthContext,
    models::{
        account::BalanceResponse,
        ledger::{HistoryQuery, LedgerEntryResponse, LedgerPage, Pagination},
        withdrawal::{
            PayoutDestination, PayoutDestinationRequest, WithdrawRequest, WithdrawalRequest,
            WithdrawalResponse,
        },
    },
    services::{account_service, ledger, withdrawal_service},
    state::AppState,
};

const MAX_PAGE_SIZE: u32 = 100;

/// Current balance and lifetime counters.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "balance": "1450.00",
///   "total_earned": "200.00",
///   "total_withdrawn": "500.00"
/// }
/// ```
pub async fn get_balance(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<BalanceResponse>, AppError> {
    let account = account_service::get_balance(&state.pool, auth.account_id()?).await?;
    Ok(Json(account.into()))
}

/// Page through the caller's ledger, newest first.
///
/// `limit` is clamped to `1..=100`; `page` starts at 1.
pub async fn list_transactions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<LedgerPage>, AppError> {
    let account_id = auth.account_id()?;
    let limit = query.limit.clamp(1, MAX_PAGE_SIZE);
    let page = query.page.max(1);
    let offset = u64::from(page - 1) * u64::from(limit);

    let (entries, total) = ledger::history(&state.pool, account_id, limit, offset).await?;
    let total_pages = (total.max(0) as u64).div_ceil(u64::from(limit)) as u32;

    Ok(Json(LedgerPage {
        entries: entries.into_iter().map(Into::into).collect(),
        pagination: Pagination {
            current_page: page,
            total_pages,
            total_records: total,
            limit,
        },
    }))
}

/// One of the caller's entries, for re-querying an uncertain outcome.
///
/// Returns 404 when the entry doesn't exist or belongs to someone else.
pub async fn get_transaction(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(entry_id): Path<Uuid>,
) -> Result<Json<LedgerEntryResponse>, AppError> {
    let entry = ledger::get_entry(&state.pool, auth.account_id()?, entry_id)
        .await?
        .ok_or_else(|| AppError::UnknownReference(format!("ledger entry {entry_id}")))?;

    Ok(Json(entry.into()))
}

/// Request a withdrawal.
///
/// # Request Body
///
/// ```json
/// {
///   "amount": "500.00",
///   "payment_method": "upi",
///   "destination": "user@bank"
/// }
/// ```
///
/// # Response
///
/// - **200 OK**: hold placed, status `pending`
/// - **400**: below the minimum or missing destination
/// - **422**: insufficient balance
/// - **429**: same request repeated within the duplicate window
pub async fn withdraw(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<WithdrawRequest>,
) -> Result<Json<WithdrawalResponse>, AppError> {
    let account_id = auth.account_id()?;
    idempotency::guard(state.idempotency.as_ref(), account_id, "wallet.withdraw", &request)
        .await?;

    let response = detached(async move {
        withdrawal_service::request_withdrawal(
            &state.ledger,
            &state.notifier,
            account_id,
            &request,
            state.settings.min_withdrawal,
        )
        .await
    })
    .await?;

    Ok(Json(response))
}

/// The caller's withdrawal requests, newest first.
pub async fn list_withdrawals(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<WithdrawalRequest>>, AppError> {
    let requests = withdrawal_service::list_for_account(&state.pool, auth.account_id()?).await?;
    Ok(Json(requests))
}

pub async fn get_payout_destination(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Option<PayoutDestination>>, AppError> {
    let destination =
        withdrawal_service::get_payout_destination(&state.pool, auth.account_id()?).await?;
    Ok(Json(destination))
}

pub async fn save_payout_destination(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<PayoutDestinationRequest>,
) -> Result<Json<PayoutDestination>, AppError> {
    let destination =
        withdrawal_service::save_payout_destination(&state.pool, auth.account_id()?, &request)
            .await?;
    Ok(Json(destination))
}
