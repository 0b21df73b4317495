//! Database connection pool, migrations, and units of work.
//!
//! This module provides utilities for:
//! - Creating and managing a PostgreSQL connection pool
//! - Running database migrations automatically
//! - Opening a transaction with a bounded lock wait

use std::time::Duration;

use sqlx::{Pool, Postgres, Transaction};

use crate::error::AppError;

/// Type alias for PostgreSQL connection pool.
pub type DbPool = Pool<Postgres>;

/// An open database transaction.
///
/// Dropping it without calling `commit` rolls back every statement issued
/// through it, so any `?` exit from a unit of work leaves no partial state.
pub type UnitOfWork = Transaction<'static, Postgres>;

/// Create a new PostgreSQL connection pool.
///
/// # Errors
///
/// Returns an error if:
/// - Database connection string is invalid
/// - Cannot connect to PostgreSQL server
/// - Database authentication fails
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

/// Run database migrations from the `migrations/` directory.
///
/// Migrations are tracked in the `_sqlx_migrations` table, so each migration
/// runs only once.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Begin a transaction whose row-lock waits are bounded by `lock_timeout`.
///
/// `set_config(..., true)` scopes the setting to this transaction, the
/// parameterised equivalent of `SET LOCAL lock_timeout`.
pub async fn begin(pool: &DbPool, lock_timeout: Duration) -> Result<UnitOfWork, AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT set_config('lock_timeout', $1, true)")
        .bind(format!("{}ms", lock_timeout.as_millis()))
        .execute(&mut *tx)
        .await?;

    Ok(tx)
}

/// Commit a unit of work.
///
/// A failed commit leaves the outcome unknown from the caller's side, so it
/// is reported as `OutcomeUnknown` and never retried.
pub async fn commit(tx: UnitOfWork) -> Result<(), AppError> {
    tx.commit().await.map_err(|err| {
        tracing::error!(error = ?err, "commit failed, outcome unknown");
        AppError::OutcomeUnknown
    })
}
