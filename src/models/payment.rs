//! Payment order models for gateway deposits.
//!
//! # Deposit Flow
//!
//! 1. Client asks for an order; the gateway creates it and we store a
//!    `created` payment order
//! 2. Client pays on the gateway's checkout
//! 3. Client posts the signed confirmation to `/api/v1/payments/verify`
//! 4. The order is credited exactly once and moves to `captured`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::Money;

/// Maps to the `payment_status` PostgreSQL enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Created,
    Captured,
    Failed,
}

/// Represents a row of the `payment_orders` table.
///
/// `ledger_entry_id` is set by the same transaction that credits the order;
/// a non-null value means the order has been reconciled.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct PaymentOrder {
    pub id: Uuid,
    pub account_id: Uuid,
    pub external_order_id: String,
    pub external_payment_id: Option<String>,
    pub amount: Money,
    pub currency: String,
    pub status: PaymentStatus,
    pub ledger_entry_id: Option<Uuid>,
    pub payment_method: Option<String>,
    pub error_code: Option<String>,
    pub error_description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for `POST /api/v1/payments/orders`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub amount: Money,
}

/// Response body for a newly created order; the client hands these to the
/// gateway checkout.
#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub order_id: String,
    pub amount: Money,
    pub currency: String,
    pub key: String,
}

/// Request body for `POST /api/v1/payments/verify`.
///
/// ```json
/// {
///   "order_id": "order_Nx1...",
///   "payment_id": "pay_Nx2...",
///   "signature": "5f0c..."
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyPaymentRequest {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyPaymentResponse {
    pub amount: Money,
    pub new_balance: Money,
    pub ledger_entry_id: Uuid,
}

/// Order state as returned to clients resolving an uncertain outcome.
#[derive(Debug, Serialize)]
pub struct PaymentOrderResponse {
    pub order_id: String,
    pub amount: Money,
    pub currency: String,
    pub status: PaymentStatus,
    pub ledger_entry_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<PaymentOrder> for PaymentOrderResponse {
    fn from(order: PaymentOrder) -> Self {
        Self {
            order_id: order.external_order_id,
            amount: order.amount,
            currency: order.currency,
            status: order.status,
            ledger_entry_id: order.ledger_entry_id,
            created_at: order.created_at,
        }
    }
}
