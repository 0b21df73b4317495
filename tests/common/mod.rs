#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;
use wallet_ledger::{
    error::AppError,
    gateway::{GatewayOrder, PaymentGateway},
    models::{
        ledger::{CreditRequest, EntryKind},
        notification::Notification,
    },
    money::Money,
    services::{
        account_service,
        ledger::{self, Ledger},
        notification_service::{NotificationSink, Notifier},
        retry::RetryPolicy,
    },
};

pub const KEY_SECRET: &str = "test_key_secret";
pub const WEBHOOK_SECRET: &str = "test_webhook_secret";

pub fn money(s: &str) -> Money {
    s.parse().unwrap()
}

pub fn ledger(pool: &PgPool) -> Ledger {
    Ledger::new(
        pool.clone(),
        Duration::from_secs(5),
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(10),
        },
    )
}

/// Open an account and fund it with a deposit (skipped for zero).
pub async fn funded_account(ledger: &Ledger, amount: &str) -> Uuid {
    let account = account_service::open_account(ledger.pool()).await.unwrap();
    let amount = money(amount);
    if !amount.is_zero() {
        ledger
            .credit(&CreditRequest {
                account_id: account.id,
                amount,
                kind: EntryKind::Deposit,
                description: "Seed deposit".to_string(),
                reference_id: None,
            })
            .await
            .unwrap();
    }
    account.id
}

pub async fn balance(pool: &PgPool, account_id: Uuid) -> Money {
    ledger::get_account(pool, account_id).await.unwrap().balance
}

pub async fn admin(pool: &PgPool) -> Uuid {
    sqlx::query_scalar("INSERT INTO admin_users (username) VALUES ($1) RETURNING id")
        .bind(format!("admin-{}", Uuid::new_v4()))
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Collects notifications in memory.
#[derive(Clone, Default)]
pub struct RecordingSink(pub Arc<Mutex<Vec<Notification>>>);

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(&self, notification: &Notification) -> Result<(), AppError> {
        self.0.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

pub fn notifier() -> Notifier {
    Notifier::disabled()
}

/// Gateway stub that hands out sequential order ids.
#[derive(Default)]
pub struct StubGateway {
    pub calls: Mutex<Vec<(Money, String)>>,
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_order(
        &self,
        amount: Money,
        currency: &str,
        _receipt: &str,
    ) -> Result<GatewayOrder, AppError> {
        let mut calls = self.calls.lock().unwrap();
        calls.push((amount, currency.to_string()));
        Ok(GatewayOrder {
            id: format!("order_test_{}", calls.len()),
        })
    }
}

/// Insert a `created` payment order directly.
pub async fn payment_order(pool: &PgPool, account_id: Uuid, order_id: &str, amount: &str) {
    sqlx::query(
        "INSERT INTO payment_orders (account_id, external_order_id, amount, currency) VALUES ($1, $2, $3, 'INR')",
    )
    .bind(account_id)
    .bind(order_id)
    .bind(money(amount))
    .execute(pool)
    .await
    .unwrap();
}
