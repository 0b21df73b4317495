//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.
//!
//! Errors fall in two groups. Business declines (`InvalidAmount`,
//! `InsufficientFunds`, `AlreadyProcessed`, ...) are final: no money moved and
//! retrying the same request will fail the same way. Transient failures
//! (`LockTimeout`, connection loss) are retried internally by
//! [`crate::services::retry::with_retry`] and surface as `Unavailable` once the
//! retry budget is spent.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// SQLSTATE raised by PostgreSQL when `lock_timeout` expires.
const LOCK_NOT_AVAILABLE: &str = "55P03";
/// SQLSTATE for `serialization_failure`.
const SERIALIZATION_FAILURE: &str = "40001";
/// SQLSTATE for `deadlock_detected`.
const DEADLOCK_DETECTED: &str = "40P01";

/// Application-wide error type.
///
/// Each variant maps to a specific HTTP status code and error code string.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (connection error, query error, ...).
    ///
    /// Conversion from `sqlx::Error` is hand-written so lock timeouts can be
    /// split out as [`AppError::LockTimeout`].
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// Amount is zero, negative, or carries more than two decimal places.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// A debit exceeds the current balance.
    #[error("Insufficient balance")]
    InsufficientFunds,

    /// A refund or approval targets a ledger entry that does not exist, does
    /// not belong to the account, or cannot be reversed.
    #[error("Unknown reference: {0}")]
    UnknownReference(String),

    /// The external order has already been credited.
    #[error("Payment already processed")]
    AlreadyProcessed,

    /// The withdrawal request already has a terminal decision.
    #[error("Withdrawal already decided")]
    AlreadyDecided,

    /// The payment gateway signature did not match.
    #[error("Invalid signature")]
    SignatureInvalid,

    /// Waited too long for a row lock held by another transaction.
    #[error("Timed out waiting for a lock")]
    LockTimeout,

    #[error("Account not found")]
    AccountNotFound,

    #[error("Payment order not found")]
    OrderNotFound,

    #[error("Withdrawal request not found")]
    WithdrawalNotFound,

    #[error("Task not found")]
    TaskNotFound,

    #[error("Plan not found")]
    PlanNotFound,

    /// Same request from the same actor seen inside the idempotency window.
    #[error("Duplicate request detected. Please wait before retrying.")]
    DuplicateRequest,

    /// Request body or parameters are invalid.
    #[error("Invalid request")]
    InvalidRequest(String),

    /// Bearer token is missing, unknown, or inactive.
    #[error("Invalid access token")]
    Unauthorized,

    /// The caller is authenticated but not allowed to perform the operation.
    #[error("Forbidden")]
    Forbidden,

    /// The payment gateway rejected or failed a call.
    #[error("Payment gateway error: {0}")]
    Gateway(String),

    /// Transient failures persisted through every retry attempt.
    #[error("Service temporarily unavailable, please try again")]
    Unavailable,

    /// The commit was attempted but its outcome could not be confirmed.
    ///
    /// The caller must re-query ledger state by reference instead of
    /// repeating the mutation.
    #[error("Outcome unknown, re-query by reference before retrying")]
    OutcomeUnknown,
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.code().as_deref() == Some(LOCK_NOT_AVAILABLE) {
                return AppError::LockTimeout;
            }
        }
        AppError::Database(err)
    }
}

impl AppError {
    /// Whether re-running the whole unit of work from scratch may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::LockTimeout => true,
            AppError::Database(err) => match err {
                sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
                sqlx::Error::Database(db_err) => matches!(
                    db_err.code().as_deref(),
                    Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED)
                ),
                _ => false,
            },
            _ => false,
        }
    }

    /// Whether the error is a unique-constraint violation.
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            AppError::Database(sqlx::Error::Database(db_err)) if db_err.is_unique_violation()
        )
    }

    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::InvalidAmount(_) => (StatusCode::BAD_REQUEST, "invalid_amount"),
            AppError::InsufficientFunds => {
                (StatusCode::UNPROCESSABLE_ENTITY, "insufficient_funds")
            }
            AppError::UnknownReference(_) => (StatusCode::NOT_FOUND, "unknown_reference"),
            AppError::AlreadyProcessed => (StatusCode::CONFLICT, "already_processed"),
            AppError::AlreadyDecided => (StatusCode::CONFLICT, "already_decided"),
            AppError::SignatureInvalid => (StatusCode::BAD_REQUEST, "signature_invalid"),
            AppError::AccountNotFound => (StatusCode::NOT_FOUND, "account_not_found"),
            AppError::OrderNotFound => (StatusCode::NOT_FOUND, "order_not_found"),
            AppError::WithdrawalNotFound => (StatusCode::NOT_FOUND, "withdrawal_not_found"),
            AppError::TaskNotFound => (StatusCode::NOT_FOUND, "task_not_found"),
            AppError::PlanNotFound => (StatusCode::NOT_FOUND, "plan_not_found"),
            AppError::DuplicateRequest => (StatusCode::TOO_MANY_REQUESTS, "duplicate_request"),
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "invalid_access_token"),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::Gateway(_) => (StatusCode::BAD_GATEWAY, "gateway_error"),
            AppError::LockTimeout | AppError::Unavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
            }
            AppError::OutcomeUnknown => (StatusCode::SERVICE_UNAVAILABLE, "outcome_unknown"),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

/// Convert AppError into an HTTP response.
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "error": {
///     "code": "insufficient_funds",
///     "message": "Insufficient balance"
///   }
/// }
/// ```
///
/// Database details are logged and hidden from the client.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();

        let message = match self {
            AppError::InvalidRequest(ref msg) => msg.clone(),
            AppError::Database(ref err) => {
                tracing::error!(error = ?err, "database error");
                "An internal error occurred".to_string()
            }
            AppError::Gateway(ref msg) => {
                tracing::error!(error = %msg, "payment gateway error");
                "Payment gateway error".to_string()
            }
            ref other => other.to_string(),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declines_are_not_transient() {
        assert!(!AppError::InsufficientFunds.is_transient());
        assert!(!AppError::AlreadyProcessed.is_transient());
        assert!(!AppError::OutcomeUnknown.is_transient());
        assert!(AppError::LockTimeout.is_transient());
        assert!(AppError::Database(sqlx::Error::PoolTimedOut).is_transient());
        assert!(!AppError::Database(sqlx::Error::RowNotFound).is_transient());
    }

    #[test]
    fn declines_and_outages_have_distinct_statuses() {
        let declined = AppError::InsufficientFunds.into_response();
        assert_eq!(declined.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let unavailable = AppError::Unavailable.into_response();
        assert_eq!(unavailable.status(), StatusCode::SERVICE_UNAVAILABLE);

        let duplicate = AppError::DuplicateRequest.into_response();
        assert_eq!(duplicate.status(), StatusCode::TOO_MANY_REQUESTS);

        let decided = AppError::AlreadyDecided.into_response();
        assert_eq!(decided.status(), StatusCode::CONFLICT);
    }
}
