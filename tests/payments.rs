mod common;

use std::sync::Arc;

use common::{
    KEY_SECRET, RecordingSink, StubGateway, WEBHOOK_SECRET, balance, funded_account, ledger,
    money, notifier, payment_order,
};
use sqlx::PgPool;
use wallet_ledger::{
    error::AppError,
    gateway::{sign_payment, sign_webhook},
    models::{
        ledger::EntryKind,
        payment::{CreateOrderRequest, PaymentStatus, VerifyPaymentRequest},
    },
    money::Money,
    services::{
        ledger::entries_in_order, notification_service::Notifier, payment_service,
        payment_service::DepositSettings,
    },
};

fn signed(order_id: &str, payment_id: &str) -> VerifyPaymentRequest {
    VerifyPaymentRequest {
        order_id: order_id.to_string(),
        payment_id: payment_id.to_string(),
        signature: sign_payment(KEY_SECRET, order_id, payment_id).unwrap(),
    }
}

fn settings() -> DepositSettings {
    DepositSettings {
        currency: "INR".to_string(),
        minimum: Money::from_major(100),
        key_id: "rzp_test_key".to_string(),
    }
}

#[sqlx::test]
async fn verified_payment_is_credited_once(pool: PgPool) {
    let ledger = ledger(&pool);
    let account = funded_account(&ledger, "0").await;
    payment_order(&pool, account, "order_1", "500.00").await;

    let sink = RecordingSink::default();
    let notifier = Notifier::new(Arc::new(sink.clone()));

    let response = payment_service::verify_and_credit(
        &ledger,
        &notifier,
        KEY_SECRET,
        account,
        &signed("order_1", "pay_1"),
    )
    .await
    .unwrap();
    assert_eq!(response.amount, money("500.00"));
    assert_eq!(response.new_balance, money("500.00"));

    let order = payment_service::get_order(&pool, account, "order_1").await.unwrap();
    assert_eq!(order.status, PaymentStatus::Captured);
    assert_eq!(order.ledger_entry_id, Some(response.ledger_entry_id));
    assert_eq!(order.external_payment_id.as_deref(), Some("pay_1"));

    let entries = entries_in_order(&pool, account).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, EntryKind::Deposit);
    assert_eq!(entries[0].reference_id.as_deref(), Some("pay_1"));

    let again = payment_service::verify_and_credit(
        &ledger,
        &notifier,
        KEY_SECRET,
        account,
        &signed("order_1", "pay_1"),
    )
    .await;
    assert!(matches!(again, Err(AppError::AlreadyProcessed)));
    assert_eq!(balance(&pool, account).await, money("500.00"));

    // Delivery happens on a background task.
    for _ in 0..100 {
        if !sink.0.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    let delivered = sink.0.lock().unwrap().clone();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].account_id, account);
}

#[sqlx::test]
async fn racing_verifications_credit_exactly_once(pool: PgPool) {
    let ledger = ledger(&pool);
    let account = funded_account(&ledger, "0").await;
    payment_order(&pool, account, "order_race", "750.00").await;

    let mut handles = Vec::new();
    for _ in 0..5 {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move {
            payment_service::verify_and_credit(
                &ledger,
                &notifier(),
                KEY_SECRET,
                account,
                &signed("order_race", "pay_race"),
            )
            .await
        }));
    }

    let mut credited = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => credited += 1,
            Err(AppError::AlreadyProcessed) => rejected += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(credited, 1);
    assert_eq!(rejected, 4);
    assert_eq!(balance(&pool, account).await, money("750.00"));
    assert_eq!(entries_in_order(&pool, account).await.unwrap().len(), 1);
}

#[sqlx::test]
async fn bad_signature_changes_nothing(pool: PgPool) {
    let ledger = ledger(&pool);
    let account = funded_account(&ledger, "0").await;
    payment_order(&pool, account, "order_1", "500.00").await;

    let mut forged = signed("order_1", "pay_1");
    forged.payment_id = "pay_other".to_string();

    let result =
        payment_service::verify_and_credit(&ledger, &notifier(), KEY_SECRET, account, &forged)
            .await;
    assert!(matches!(result, Err(AppError::SignatureInvalid)));

    let order = payment_service::get_order(&pool, account, "order_1").await.unwrap();
    assert_eq!(order.status, PaymentStatus::Created);
    assert!(order.ledger_entry_id.is_none());
    assert_eq!(balance(&pool, account).await, Money::ZERO);
}

#[sqlx::test]
async fn orders_are_scoped_to_their_account(pool: PgPool) {
    let ledger = ledger(&pool);
    let owner = funded_account(&ledger, "0").await;
    let intruder = funded_account(&ledger, "0").await;
    payment_order(&pool, owner, "order_1", "500.00").await;

    let result = payment_service::verify_and_credit(
        &ledger,
        &notifier(),
        KEY_SECRET,
        intruder,
        &signed("order_1", "pay_1"),
    )
    .await;
    assert!(matches!(result, Err(AppError::OrderNotFound)));

    let missing = payment_service::verify_and_credit(
        &ledger,
        &notifier(),
        KEY_SECRET,
        owner,
        &signed("order_missing", "pay_1"),
    )
    .await;
    assert!(matches!(missing, Err(AppError::OrderNotFound)));

    assert!(matches!(
        payment_service::get_order(&pool, intruder, "order_1").await,
        Err(AppError::OrderNotFound)
    ));
    assert_eq!(balance(&pool, owner).await, Money::ZERO);
    assert_eq!(balance(&pool, intruder).await, Money::ZERO);
}

#[sqlx::test]
async fn create_order_enforces_minimum_and_records_order(pool: PgPool) {
    let ledger = ledger(&pool);
    let account = funded_account(&ledger, "0").await;
    let gateway = StubGateway::default();

    let small = payment_service::create_order(
        &pool,
        &gateway,
        &settings(),
        account,
        &CreateOrderRequest {
            amount: money("99.00"),
        },
    )
    .await;
    assert!(matches!(small, Err(AppError::InvalidAmount(_))));
    assert!(gateway.calls.lock().unwrap().is_empty());

    let created = payment_service::create_order(
        &pool,
        &gateway,
        &settings(),
        account,
        &CreateOrderRequest {
            amount: money("250.00"),
        },
    )
    .await
    .unwrap();
    assert_eq!(created.order_id, "order_test_1");
    assert_eq!(created.currency, "INR");
    assert_eq!(created.key, "rzp_test_key");

    let order = payment_service::get_order(&pool, account, "order_test_1").await.unwrap();
    assert_eq!(order.amount, money("250.00"));
    assert_eq!(order.status, PaymentStatus::Created);
}

fn webhook_body(event: &str, order_id: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "entity": "event",
        "event": event,
        "payload": {"payment": {"entity": {
            "id": "pay_hook",
            "order_id": order_id,
            "method": "upi",
            "error_code": "BAD_REQUEST_ERROR",
            "error_description": "Payment declined"
        }}}
    }))
    .unwrap()
}

#[sqlx::test]
async fn failed_webhook_marks_unreconciled_order(pool: PgPool) {
    let ledger = ledger(&pool);
    let account = funded_account(&ledger, "0").await;
    payment_order(&pool, account, "order_1", "500.00").await;

    let body = webhook_body("payment.failed", "order_1");
    let signature = sign_webhook(WEBHOOK_SECRET, &body).unwrap();
    payment_service::handle_webhook(&pool, WEBHOOK_SECRET, &body, &signature)
        .await
        .unwrap();

    let order = payment_service::get_order(&pool, account, "order_1").await.unwrap();
    assert_eq!(order.status, PaymentStatus::Failed);
    assert_eq!(order.error_code.as_deref(), Some("BAD_REQUEST_ERROR"));
    assert_eq!(order.payment_method.as_deref(), Some("upi"));
    assert_eq!(balance(&pool, account).await, Money::ZERO);
}

#[sqlx::test]
async fn webhooks_never_credit_or_undo_a_capture(pool: PgPool) {
    let ledger = ledger(&pool);
    let account = funded_account(&ledger, "0").await;
    payment_order(&pool, account, "order_1", "500.00").await;

    let captured = webhook_body("payment.captured", "order_1");
    let signature = sign_webhook(WEBHOOK_SECRET, &captured).unwrap();
    payment_service::handle_webhook(&pool, WEBHOOK_SECRET, &captured, &signature)
        .await
        .unwrap();
    assert_eq!(balance(&pool, account).await, Money::ZERO);

    payment_service::verify_and_credit(
        &ledger,
        &notifier(),
        KEY_SECRET,
        account,
        &signed("order_1", "pay_1"),
    )
    .await
    .unwrap();

    let failed = webhook_body("payment.failed", "order_1");
    let signature = sign_webhook(WEBHOOK_SECRET, &failed).unwrap();
    payment_service::handle_webhook(&pool, WEBHOOK_SECRET, &failed, &signature)
        .await
        .unwrap();

    let order = payment_service::get_order(&pool, account, "order_1").await.unwrap();
    assert_eq!(order.status, PaymentStatus::Captured);
    assert_eq!(order.payment_method.as_deref(), Some("upi"));
    assert_eq!(balance(&pool, account).await, money("500.00"));
}

#[sqlx::test]
async fn webhook_signature_is_checked_first(pool: PgPool) {
    let ledger = ledger(&pool);
    let account = funded_account(&ledger, "0").await;
    payment_order(&pool, account, "order_1", "500.00").await;

    let body = webhook_body("payment.failed", "order_1");
    let signature = sign_webhook("wrong_secret", &body).unwrap();
    let result = payment_service::handle_webhook(&pool, WEBHOOK_SECRET, &body, &signature).await;
    assert!(matches!(result, Err(AppError::SignatureInvalid)));

    let order = payment_service::get_order(&pool, account, "order_1").await.unwrap();
    assert_eq!(order.status, PaymentStatus::Created);
}
