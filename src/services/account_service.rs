//! Account provisioning and balance reads.

use uuid::Uuid;

use crate::{db::DbPool, error::AppError, models::account::Account};

/// Create an empty account.
///
/// Called once per registered user. The balance and both lifetime counters
/// start at zero; only the ledger moves them afterwards.
pub async fn open_account(pool: &DbPool) -> Result<Account, AppError> {
    let account = sqlx::query_as::<_, Account>("INSERT INTO accounts DEFAULT VALUES RETURNING *")
        .fetch_one(pool)
        .await?;

    tracing::info!(account_id = %account.id, "account opened");
    Ok(account)
}

/// Current balance and counters.
pub async fn get_balance(pool: &DbPool, account_id: Uuid) -> Result<Account, AppError> {
    crate::services::ledger::get_account(pool, account_id).await
}
