//! Investment plan models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::money::Money;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Plan {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub daily_profit: Money,
    pub duration_days: i32,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

/// Request body for creating (`POST /api/v1/admin/plans`) or replacing
/// (`PUT /api/v1/admin/plans/{id}`) a plan.
///
/// ```json
/// {
///   "name": "Supreme",
///   "price": "1450.00",
///   "daily_profit": "48.00",
///   "duration_days": 30
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct PlanRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub daily_profit: Money,
    pub duration_days: i32,
    #[serde(default)]
    pub sort_order: i32,
    /// Only read on update; new plans always start on sale.
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl PlanRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::InvalidRequest("Plan name is required".to_string()));
        }
        self.price.ensure_positive()?;
        if self.duration_days <= 0 {
            return Err(AppError::InvalidRequest(
                "Duration must be at least one day".to_string(),
            ));
        }
        Ok(())
    }
}

/// A plan owned by an account, created together with its `plan_purchase`
/// debit.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct AccountPlan {
    pub id: Uuid,
    pub account_id: Uuid,
    pub plan_id: Uuid,
    pub ledger_entry_id: Uuid,
    pub purchase_price: Money,
    pub daily_profit: Money,
    pub total_days: i32,
    pub is_active: bool,
    pub purchased_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    pub account_plan_id: Uuid,
    pub plan_name: String,
    pub daily_profit: Money,
    pub duration_days: i32,
    pub new_balance: Money,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_request_defaults_and_checks() {
        let body = r#"{"name": "Basic", "price": "100", "daily_profit": "3.30", "duration_days": 30}"#;
        let request: PlanRequest = serde_json::from_str(body).unwrap();
        assert!(request.is_active);
        assert_eq!(request.sort_order, 0);
        request.validate().unwrap();

        let free = PlanRequest {
            price: Money::ZERO,
            ..request.clone()
        };
        assert!(matches!(free.validate(), Err(AppError::InvalidAmount(_))));

        let endless = PlanRequest {
            duration_days: 0,
            ..request
        };
        assert!(matches!(endless.validate(), Err(AppError::InvalidRequest(_))));
    }
}
