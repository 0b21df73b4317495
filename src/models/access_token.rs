//! Access token model used to resolve the caller's identity.
//!
//! Tokens are issued by the authentication service and stored here as
//! SHA-256 hashes. Each token resolves to exactly one principal: a user
//! account or an admin.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Represents an access token record from the database.
///
/// # Database Table
///
/// Maps to the `access_tokens` table. A CHECK constraint guarantees that
/// exactly one of `account_id` / `admin_id` is set.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccessToken {
    pub id: Uuid,

    /// SHA-256 hash of the bearer token (64 hex characters)
    pub token_hash: String,

    pub account_id: Option<Uuid>,
    pub admin_id: Option<Uuid>,

    /// Inactive tokens are rejected during authentication.
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
}

/// Who is making a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Principal {
    Account(Uuid),
    Admin(Uuid),
}

impl AccessToken {
    pub fn principal(&self) -> Option<Principal> {
        match (self.account_id, self.admin_id) {
            (Some(account_id), None) => Some(Principal::Account(account_id)),
            (None, Some(admin_id)) => Some(Principal::Admin(admin_id)),
            _ => None,
        }
    }
}
