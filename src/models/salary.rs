//! Salary and referral payout models.
//!
//! Eligibility and amounts are worked out by the referral/manager tier
//! component; the ledger only records a precomputed payout, at most once per
//! account and period.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::money::Money;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct SalaryPayout {
    pub id: Uuid,
    pub account_id: Uuid,
    pub period: String,
    pub amount: Money,
    pub ledger_entry_id: Uuid,
    pub paid_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Request body for `POST /api/v1/admin/salary-payouts`.
///
/// `period` is a calendar month, `YYYY-MM`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalaryPayoutRequest {
    pub account_id: Uuid,
    pub period: String,
    pub amount: Money,
}

impl SalaryPayoutRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        self.amount.ensure_positive()?;
        if !is_month(&self.period) {
            return Err(AppError::InvalidRequest(
                "Period must be formatted as YYYY-MM".to_string(),
            ));
        }
        Ok(())
    }
}

fn is_month(period: &str) -> bool {
    chrono::NaiveDate::parse_from_str(&format!("{period}-01"), "%Y-%m-%d").is_ok()
        && period.len() == 7
}
