//! Account data models and API response types.
//!
//! This module defines:
//! - `Account`: Database entity holding a user's balance
//! - `BalanceResponse`: Response body for the wallet balance endpoint

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::money::Money;

/// Represents an account record from the database.
///
/// # Database Table
///
/// Maps to the `accounts` table. There is one account per user.
///
/// # Balance Storage
///
/// Balances are `NUMERIC(14,2)` fixed-point values, never floats. The
/// `balance >= 0` invariant is enforced twice: by the balance mutator before
/// writing and by a database CHECK constraint.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Account {
    pub id: Uuid,

    /// Spendable balance. Only the balance mutator writes this, while
    /// holding the row lock.
    pub balance: Money,

    /// Lifetime rewards credited (task rewards, referral and salary payouts).
    ///
    /// Never decreases.
    pub total_earned: Money,

    /// Lifetime withdrawals requested, counted when the hold is placed.
    ///
    /// Never decreases, even when a withdrawal is later rejected.
    pub total_withdrawn: Money,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Response body for `GET /api/v1/wallet/balance`.
///
/// ```json
/// {
///   "balance": "1450.00",
///   "total_earned": "200.00",
///   "total_withdrawn": "500.00"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub balance: Money,
    pub total_earned: Money,
    pub total_withdrawn: Money,
}

impl From<Account> for BalanceResponse {
    fn from(account: Account) -> Self {
        Self {
            balance: account.balance,
            total_earned: account.total_earned,
            total_withdrawn: account.total_withdrawn,
        }
    }
}

/// Response body for account provisioning.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub balance: Money,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            balance: account.balance,
            created_at: account.created_at,
        }
    }
}
