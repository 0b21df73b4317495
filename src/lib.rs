//! Wallet ledger service.
//!
//! Keeps per-account balances and an append-only ledger of every balance
//! change. All balance writes go through [`services::ledger`], which locks
//! the account row, checks the non-negative invariant and records the
//! entry in the same transaction. Withdrawals, gateway deposits, task
//! rewards, plan purchases and salary payouts are orchestrators on top of it.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx, row-level locks for serialization
//! - **Authentication**: bearer tokens stored as SHA-256 hashes
//! - **Money**: `rust_decimal` fixed-point, two decimal places

pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod idempotency;
pub mod middleware;
pub mod models;
pub mod money;
pub mod services;
pub mod state;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the HTTP router.
pub fn router(state: AppState) -> Router {
    let authenticated_routes = Router::new()
        // Wallet
        .route("/api/v1/wallet/balance", get(handlers::wallet::get_balance))
        .route(
            "/api/v1/wallet/transactions",
            get(handlers::wallet::list_transactions),
        )
        .route(
            "/api/v1/wallet/transactions/{id}",
            get(handlers::wallet::get_transaction),
        )
        .route("/api/v1/wallet/withdraw", post(handlers::wallet::withdraw))
        .route(
            "/api/v1/wallet/withdrawals",
            get(handlers::wallet::list_withdrawals),
        )
        .route(
            "/api/v1/wallet/payout-destination",
            get(handlers::wallet::get_payout_destination)
                .put(handlers::wallet::save_payout_destination),
        )
        // Payments
        .route(
            "/api/v1/payments/orders",
            post(handlers::payments::create_order),
        )
        .route(
            "/api/v1/payments/orders/{external_order_id}",
            get(handlers::payments::get_order),
        )
        .route(
            "/api/v1/payments/verify",
            post(handlers::payments::verify_payment),
        )
        // Tasks
        .route("/api/v1/tasks", get(handlers::tasks::list_tasks))
        .route("/api/v1/tasks/history", get(handlers::tasks::task_history))
        .route(
            "/api/v1/tasks/{id}/start",
            post(handlers::tasks::start_task),
        )
        .route(
            "/api/v1/tasks/completions/{id}/complete",
            post(handlers::tasks::complete_task),
        )
        // Plans
        .route("/api/v1/plans", get(handlers::plans::list_plans))
        .route("/api/v1/plans/mine", get(handlers::plans::my_plans))
        .route("/api/v1/plans/{id}", get(handlers::plans::get_plan))
        .route(
            "/api/v1/plans/{id}/purchase",
            post(handlers::plans::purchase_plan),
        )
        // Admin
        .route("/api/v1/admin/accounts", post(handlers::admin::open_account))
        .route(
            "/api/v1/admin/withdrawals",
            get(handlers::admin::list_pending_withdrawals),
        )
        .route(
            "/api/v1/admin/withdrawals/{id}/decision",
            post(handlers::admin::decide_withdrawal),
        )
        .route(
            "/api/v1/admin/salary-payouts",
            post(handlers::admin::pay_salary),
        )
        .route("/api/v1/admin/plans", post(handlers::admin::create_plan))
        .route(
            "/api/v1/admin/plans/{id}",
            put(handlers::admin::update_plan).delete(handlers::admin::delete_plan),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    Router::new()
        // Public routes
        .route("/health", get(handlers::health::health_check))
        .route("/api/v1/payments/webhook", post(handlers::payments::webhook))
        .merge(authenticated_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
