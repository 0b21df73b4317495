//! User-facing notification messages.

use serde::Serialize;
use uuid::Uuid;

use crate::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Info => "info",
            NotificationKind::Success => "success",
            NotificationKind::Warning => "warning",
        }
    }
}

/// A fire-and-forget message for one account.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub account_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
}

impl Notification {
    pub fn deposit_credited(account_id: Uuid, amount: Money) -> Self {
        Self {
            account_id,
            title: "Payment Successful!".to_string(),
            message: format!("{amount} has been added to your wallet."),
            kind: NotificationKind::Success,
        }
    }

    pub fn withdrawal_requested(account_id: Uuid, amount: Money) -> Self {
        Self {
            account_id,
            title: "Withdrawal Request Submitted".to_string(),
            message: format!("Your withdrawal request of {amount} is being processed."),
            kind: NotificationKind::Info,
        }
    }

    pub fn withdrawal_approved(account_id: Uuid, amount: Money) -> Self {
        Self {
            account_id,
            title: "Withdrawal Approved".to_string(),
            message: format!("Your withdrawal request of {amount} has been approved."),
            kind: NotificationKind::Success,
        }
    }

    pub fn withdrawal_rejected(account_id: Uuid, amount: Money) -> Self {
        Self {
            account_id,
            title: "Withdrawal Rejected".to_string(),
            message: format!(
                "Your withdrawal request of {amount} has been rejected. Amount refunded to wallet."
            ),
            kind: NotificationKind::Warning,
        }
    }

    pub fn task_rewarded(account_id: Uuid, title: &str, reward: Money) -> Self {
        Self {
            account_id,
            title: "Task Completed!".to_string(),
            message: format!("You earned {reward} for completing \"{title}\""),
            kind: NotificationKind::Success,
        }
    }

    pub fn plan_purchased(account_id: Uuid, plan_name: &str, daily_profit: Money) -> Self {
        Self {
            account_id,
            title: "Plan Purchased!".to_string(),
            message: format!(
                "You successfully purchased the {plan_name} Plan. Daily profit: {daily_profit}"
            ),
            kind: NotificationKind::Success,
        }
    }

    pub fn salary_paid(account_id: Uuid, period: &str, amount: Money) -> Self {
        Self {
            account_id,
            title: "Salary Credited".to_string(),
            message: format!("Your salary of {amount} for {period} has been credited."),
            kind: NotificationKind::Success,
        }
    }
}
