//! Deposit HTTP handlers.
//!
//! - POST /api/v1/payments/orders
//! - POST /api/v1/payments/verify
//! - GET  /api/v1/payments/orders/{external_order_id}
//! - POST /api/v1/payments/webhook (gateway-signed, no bearer token)

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};
use serde_json::{Value, json};

use crate::{
    error::AppError,
    gateway::WEBHOOK_SIGNATURE_HEADER,
    handlers::detached,
    middleware::auth::AuthContext,
    models::payment::{
        CreateOrderRequest, CreateOrderResponse, PaymentOrderResponse, VerifyPaymentRequest,
        VerifyPaymentResponse,
    },
    services::payment_service,
    state::AppState,
};

/// Create a gateway order for a deposit.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "order_id": "order_Nx1...",
///   "amount": "500.00",
///   "currency": "INR",
///   "key": "rzp_live_..."
/// }
/// ```
pub async fn create_order(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Json<CreateOrderResponse>, AppError> {
    let account_id = auth.account_id()?;
    let response = payment_service::create_order(
        &state.pool,
        state.gateway.as_ref(),
        &state.settings.deposits,
        account_id,
        &request,
    )
    .await?;

    Ok(Json(response))
}

/// Verify a checkout confirmation and credit the deposit.
///
/// # Response
///
/// - **200 OK**: credited
/// - **400**: signature mismatch
/// - **404**: unknown order
/// - **409**: order already credited
pub async fn verify_payment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<Json<VerifyPaymentResponse>, AppError> {
    let account_id = auth.account_id()?;

    let response = detached(async move {
        payment_service::verify_and_credit(
            &state.ledger,
            &state.notifier,
            &state.settings.gateway_key_secret,
            account_id,
            &request,
        )
        .await
    })
    .await?;

    Ok(Json(response))
}

/// Order state, including the ledger entry if it was credited.
pub async fn get_order(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(external_order_id): Path<String>,
) -> Result<Json<PaymentOrderResponse>, AppError> {
    let order =
        payment_service::get_order(&state.pool, auth.account_id()?, &external_order_id).await?;
    Ok(Json(order.into()))
}

/// Gateway webhook receiver.
///
/// Takes the body as raw bytes: the signature covers the exact bytes sent.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let signature = headers
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::SignatureInvalid)?
        .to_string();

    detached(async move {
        payment_service::handle_webhook(
            &state.pool,
            &state.settings.gateway_webhook_secret,
            &body,
            &signature,
        )
        .await
    })
    .await?;

    Ok((StatusCode::OK, Json(json!({ "status": "ok" }))))
}
