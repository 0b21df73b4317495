//! Withdrawal request models.
//!
//! A withdrawal is created together with a pending `withdrawal` ledger entry
//! (the hold) and later resolved by an admin decision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::money::Money;

/// Maximum length of a destination string (account number, UPI id, ...).
const MAX_DESTINATION_LEN: usize = 256;

/// Maps to the `withdrawal_status` PostgreSQL enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "withdrawal_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
}

/// Where a payout is sent. Maps to the `payout_method` PostgreSQL enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payout_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PayoutMethod {
    BankTransfer,
    Upi,
    Paytm,
    Phonepe,
    Easypaisa,
    Jazzcash,
}

/// Admin decision on a pending withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
}

/// Represents a row of the `withdrawal_requests` table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct WithdrawalRequest {
    pub id: Uuid,
    pub account_id: Uuid,

    /// The pending debit that holds the funds. Its amount equals `amount`.
    pub ledger_entry_id: Uuid,

    pub amount: Money,
    pub method: PayoutMethod,
    pub destination: String,
    pub status: WithdrawalStatus,
    pub admin_id: Option<Uuid>,
    pub admin_note: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Request body for `POST /api/v1/wallet/withdraw`.
///
/// ```json
/// {
///   "amount": "500.00",
///   "payment_method": "upi",
///   "destination": "user@bank"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub amount: Money,
    pub payment_method: PayoutMethod,
    pub destination: String,
}

impl WithdrawRequest {
    /// Boundary validation before the request reaches the ledger.
    pub fn validate(&self, minimum: Money) -> Result<(), AppError> {
        self.amount.ensure_positive()?;
        if self.amount < minimum {
            return Err(AppError::InvalidAmount(format!(
                "Minimum withdrawal amount is {minimum}"
            )));
        }
        validate_destination(&self.destination)
    }
}

/// Request body for `POST /api/v1/admin/withdrawals/{id}/decision`.
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionRequest {
    pub action: Decision,
    pub admin_note: Option<String>,
}

/// Saved payout details, kept apart from ledger data.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct PayoutDestination {
    pub account_id: Uuid,
    pub method: PayoutMethod,
    pub destination: String,
    pub holder_name: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for `PUT /api/v1/wallet/payout-destination`.
#[derive(Debug, Clone, Deserialize)]
pub struct PayoutDestinationRequest {
    pub method: PayoutMethod,
    pub destination: String,
    pub holder_name: Option<String>,
}

impl PayoutDestinationRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_destination(&self.destination)
    }
}

fn validate_destination(destination: &str) -> Result<(), AppError> {
    let trimmed = destination.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidRequest(
            "Account details are required".to_string(),
        ));
    }
    if trimmed.len() > MAX_DESTINATION_LEN {
        return Err(AppError::InvalidRequest(
            "Account details are too long".to_string(),
        ));
    }
    Ok(())
}

/// Response body after a withdrawal request is accepted.
#[derive(Debug, Serialize)]
pub struct WithdrawalResponse {
    pub withdrawal_id: Uuid,
    pub ledger_entry_id: Uuid,
    pub amount: Money,
    pub new_balance: Money,
    pub status: WithdrawalStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(amount: &str, destination: &str) -> WithdrawRequest {
        WithdrawRequest {
            amount: amount.parse().unwrap(),
            payment_method: PayoutMethod::Upi,
            destination: destination.to_string(),
        }
    }

    #[test]
    fn enforces_minimum_and_destination() {
        let minimum = Money::from_major(100);
        assert!(request("100.00", "user@upi").validate(minimum).is_ok());
        assert!(matches!(
            request("99.99", "user@upi").validate(minimum),
            Err(AppError::InvalidAmount(_))
        ));
        assert!(matches!(
            request("150.00", "   ").validate(minimum),
            Err(AppError::InvalidRequest(_))
        ));
    }

    #[test]
    fn rejects_unknown_payout_method() {
        let body = r#"{"amount":"150.00","payment_method":"cash","destination":"x"}"#;
        assert!(serde_json::from_str::<WithdrawRequest>(body).is_err());

        let body = r#"{"amount":"150.00","payment_method":"bank_transfer","destination":"x"}"#;
        let parsed: WithdrawRequest = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.payment_method, PayoutMethod::BankTransfer);
    }
}
