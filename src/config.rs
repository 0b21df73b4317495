//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use std::time::Duration;

use serde::Deserialize;

use crate::money::Money;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `GATEWAY_KEY_ID`, `GATEWAY_KEY_SECRET`, `GATEWAY_WEBHOOK_SECRET` (required):
///   payment gateway credentials; the key secret signs checkout confirmations
///   and the webhook secret signs webhook bodies
/// - `LOCK_TIMEOUT_MS`, `RETRY_MAX_ATTEMPTS`, `RETRY_BASE_DELAY_MS`: ledger
///   contention tuning
/// - `IDEMPOTENCY_TTL_SECS`: duplicate-request window
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    /// How long a transaction waits for a row lock before failing with
    /// `LockTimeout`.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,

    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    #[serde(default = "default_idempotency_ttl_secs")]
    pub idempotency_ttl_secs: u64,

    #[serde(default = "default_gateway_base_url")]
    pub gateway_base_url: String,

    pub gateway_key_id: String,

    pub gateway_key_secret: String,

    pub gateway_webhook_secret: String,

    #[serde(default = "default_currency")]
    pub deposit_currency: String,

    #[serde(default = "default_minimum")]
    pub min_deposit: Money,

    #[serde(default = "default_minimum")]
    pub min_withdrawal: Money,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_max_connections() -> u32 {
    10
}

fn default_lock_timeout_ms() -> u64 {
    5_000
}

fn default_retry_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    50
}

fn default_idempotency_ttl_secs() -> u64 {
    5
}

fn default_gateway_base_url() -> String {
    "https://api.razorpay.com/v1/".to_string()
}

fn default_currency() -> String {
    "INR".to_string()
}

fn default_minimum() -> Money {
    Money::from_major(100)
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();

        // Field names are automatically converted: database_url -> DATABASE_URL
        envy::from_env::<Config>()
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn idempotency_ttl(&self) -> Duration {
        Duration::from_secs(self.idempotency_ttl_secs)
    }
}
