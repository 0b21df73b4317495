//! Gateway deposits: order creation, signed verification and webhooks.
//!
//! # Exactly-once crediting
//!
//! `verify_and_credit` locks the order row by its external id, refuses an
//! order whose `ledger_entry_id` is already set, credits the account and
//! stores the new entry id on the order, all in one transaction. Two
//! concurrent verifications of the same order therefore serialize on the
//! order row and the second sees `AlreadyProcessed`.
//!
//! Webhooks never credit. They only fill in diagnostic fields, or mark an
//! order `failed` if it was never reconciled.

use uuid::Uuid;

use crate::{
    db::{self, DbPool},
    error::AppError,
    gateway::{self, PaymentGateway},
    models::{
        ledger::{CreditRequest, EntryKind},
        notification::Notification,
        payment::{
            CreateOrderRequest, CreateOrderResponse, PaymentOrder, VerifyPaymentRequest,
            VerifyPaymentResponse,
        },
        webhook::{WebhookEnvelope, WebhookEvent},
    },
    money::Money,
    services::{
        ledger::{self, Ledger},
        notification_service::Notifier,
        retry::with_retry,
    },
};

/// Deposit settings shared by the payment handlers.
#[derive(Debug, Clone)]
pub struct DepositSettings {
    pub currency: String,
    pub minimum: Money,
    /// Public key id returned to clients for the checkout widget.
    pub key_id: String,
}

/// Create a gateway order and record it as `created`.
///
/// The gateway call happens before any transaction is opened, so no lock is
/// held while waiting on the network.
///
/// # Errors
///
/// - `InvalidAmount`: below the minimum deposit
/// - `Gateway`: the gateway rejected or failed the request
pub async fn create_order(
    pool: &DbPool,
    gateway: &dyn PaymentGateway,
    settings: &DepositSettings,
    account_id: Uuid,
    request: &CreateOrderRequest,
) -> Result<CreateOrderResponse, AppError> {
    let amount = request.amount.ensure_positive()?;
    if amount < settings.minimum {
        return Err(AppError::InvalidAmount(format!(
            "Minimum deposit amount is {}",
            settings.minimum
        )));
    }

    let receipt = format!("rcpt_{}", Uuid::new_v4().simple());
    let order = gateway
        .create_order(amount, &settings.currency, &receipt)
        .await?;

    let stored = sqlx::query_as::<_, PaymentOrder>(
        r#"
        INSERT INTO payment_orders (account_id, external_order_id, amount, currency)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(account_id)
    .bind(&order.id)
    .bind(amount)
    .bind(&settings.currency)
    .fetch_one(pool)
    .await?;

    tracing::info!(
        account_id = %account_id,
        order_id = %stored.external_order_id,
        amount = %amount,
        "payment order created"
    );

    Ok(CreateOrderResponse {
        order_id: stored.external_order_id,
        amount: stored.amount,
        currency: stored.currency,
        key: settings.key_id.clone(),
    })
}

/// Check a signed checkout confirmation and credit the order exactly once.
///
/// # Process
///
/// 1. Verify `HMAC(key_secret, order_id|payment_id)`; nothing is read on failure
/// 2. Lock the order row
/// 3. Reject if the order already has a ledger entry
/// 4. Credit a `deposit` referencing the payment id
/// 5. Mark the order `captured` with the entry id, same transaction
///
/// # Errors
///
/// - `SignatureInvalid`: signature mismatch, no state change
/// - `OrderNotFound`: no such order, or it belongs to another account
/// - `AlreadyProcessed`: the order was credited before
pub async fn verify_and_credit(
    ledger: &Ledger,
    notifier: &Notifier,
    key_secret: &str,
    account_id: Uuid,
    request: &VerifyPaymentRequest,
) -> Result<VerifyPaymentResponse, AppError> {
    if let Err(e) = gateway::verify_payment_signature(
        key_secret,
        &request.order_id,
        &request.payment_id,
        &request.signature,
    ) {
        tracing::warn!(
            account_id = %account_id,
            order_id = %request.order_id,
            "payment signature rejected"
        );
        return Err(e);
    }

    let (order, entry) = with_retry(ledger.retry_policy(), "verify_payment", || async move {
        let mut tx = ledger.begin().await?;

        let order = sqlx::query_as::<_, PaymentOrder>(
            "SELECT * FROM payment_orders WHERE external_order_id = $1 FOR UPDATE",
        )
        .bind(&request.order_id)
        .fetch_optional(&mut *tx)
        .await?
        .filter(|order| order.account_id == account_id)
        .ok_or(AppError::OrderNotFound)?;

        if order.ledger_entry_id.is_some() {
            return Err(AppError::AlreadyProcessed);
        }

        let credit = CreditRequest {
            account_id: order.account_id,
            amount: order.amount,
            kind: EntryKind::Deposit,
            description: format!("Deposit via {}", request.payment_id),
            reference_id: Some(request.payment_id.clone()),
        };
        let entry = ledger::credit_tx(&mut tx, &credit).await?;

        let order = sqlx::query_as::<_, PaymentOrder>(
            r#"
            UPDATE payment_orders
            SET status = 'captured',
                external_payment_id = $1,
                ledger_entry_id = $2,
                updated_at = NOW()
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(&request.payment_id)
        .bind(entry.id)
        .bind(order.id)
        .fetch_one(&mut *tx)
        .await?;

        db::commit(tx).await?;
        Ok((order, entry))
    })
    .await?;

    tracing::info!(
        account_id = %order.account_id,
        order_id = %order.external_order_id,
        entry_id = %entry.id,
        amount = %entry.amount,
        "payment captured"
    );
    notifier.enqueue(Notification::deposit_credited(order.account_id, entry.amount));

    Ok(VerifyPaymentResponse {
        amount: entry.amount,
        new_balance: entry.balance_after,
        ledger_entry_id: entry.id,
    })
}

/// Apply a signed gateway webhook.
///
/// The signature covers the exact raw body and is checked before parsing.
/// Events for unknown orders, or events this service does not track, are
/// acknowledged without effect.
pub async fn handle_webhook(
    pool: &DbPool,
    webhook_secret: &str,
    body: &[u8],
    signature: &str,
) -> Result<(), AppError> {
    if let Err(e) = gateway::verify_webhook_signature(webhook_secret, body, signature) {
        tracing::warn!("webhook signature rejected");
        return Err(e);
    }

    let envelope: WebhookEnvelope = serde_json::from_slice(body)
        .map_err(|e| AppError::InvalidRequest(format!("Malformed webhook body: {e}")))?;

    let kind = envelope.kind();
    let Some(payment) = envelope.payment() else {
        tracing::info!(event = %envelope.event, "webhook without payment entity ignored");
        return Ok(());
    };
    let Some(order_id) = payment.order_id.as_deref() else {
        tracing::info!(
            event = %envelope.event,
            payment_id = %payment.id,
            "webhook without order ignored"
        );
        return Ok(());
    };

    let updated = match kind {
        WebhookEvent::PaymentCaptured => {
            sqlx::query(
                r#"
                UPDATE payment_orders
                SET payment_method = COALESCE($1, payment_method),
                    external_payment_id = COALESCE(external_payment_id, $2),
                    updated_at = NOW()
                WHERE external_order_id = $3
                "#,
            )
            .bind(payment.method.as_deref())
            .bind(&payment.id)
            .bind(order_id)
            .execute(pool)
            .await?
            .rows_affected()
        }
        WebhookEvent::PaymentFailed => {
            sqlx::query(
                r#"
                UPDATE payment_orders
                SET status = CASE WHEN ledger_entry_id IS NULL THEN 'failed'::payment_status
                                  ELSE status END,
                    payment_method = COALESCE($1, payment_method),
                    error_code = $2,
                    error_description = $3,
                    updated_at = NOW()
                WHERE external_order_id = $4
                "#,
            )
            .bind(payment.method.as_deref())
            .bind(payment.error_code.as_deref())
            .bind(payment.error_description.as_deref())
            .bind(order_id)
            .execute(pool)
            .await?
            .rows_affected()
        }
        WebhookEvent::Other(ref event) => {
            tracing::debug!(event = %event, "unhandled webhook event");
            return Ok(());
        }
    };

    tracing::info!(
        event = %envelope.event,
        order_id,
        payment_id = %payment.id,
        matched = updated > 0,
        "webhook applied"
    );
    Ok(())
}

/// An account's order by external id, for resolving an uncertain outcome.
pub async fn get_order(
    pool: &DbPool,
    account_id: Uuid,
    external_order_id: &str,
) -> Result<PaymentOrder, AppError> {
    sqlx::query_as::<_, PaymentOrder>(
        "SELECT * FROM payment_orders WHERE external_order_id = $1 AND account_id = $2",
    )
    .bind(external_order_id)
    .bind(account_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::OrderNotFound)
}
