//! Shared application state handed to every handler.

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    db::DbPool,
    gateway::PaymentGateway,
    idempotency::IdempotencyGuard,
    money::Money,
    services::{
        ledger::Ledger, notification_service::Notifier, payment_service::DepositSettings,
        retry::RetryPolicy,
    },
};

/// Values read from configuration that handlers need per request.
#[derive(Debug, Clone)]
pub struct Settings {
    pub deposits: DepositSettings,
    pub min_withdrawal: Money,
    /// Signs checkout confirmations.
    pub gateway_key_secret: String,
    /// Signs webhook bodies.
    pub gateway_webhook_secret: String,
}

impl From<&Config> for Settings {
    fn from(config: &Config) -> Self {
        Self {
            deposits: DepositSettings {
                currency: config.deposit_currency.clone(),
                minimum: config.min_deposit,
                key_id: config.gateway_key_id.clone(),
            },
            min_withdrawal: config.min_withdrawal,
            gateway_key_secret: config.gateway_key_secret.clone(),
            gateway_webhook_secret: config.gateway_webhook_secret.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub ledger: Ledger,
    pub notifier: Notifier,
    pub idempotency: Arc<dyn IdempotencyGuard>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(
        pool: DbPool,
        config: &Config,
        notifier: Notifier,
        idempotency: Arc<dyn IdempotencyGuard>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        let retry = RetryPolicy {
            max_attempts: config.retry_max_attempts,
            base_delay: config.retry_base_delay(),
        };
        let ledger = Ledger::new(pool.clone(), config.lock_timeout(), retry);

        Self {
            pool,
            ledger,
            notifier,
            idempotency,
            gateway,
            settings: Arc::new(Settings::from(config)),
        }
    }
}

impl FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}
