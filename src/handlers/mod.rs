//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Resolves the caller from `AuthContext`
//! 3. Calls a service and returns its result as JSON
//!
//! Mutating handlers run the service call through [`detached`], so a client
//! that disconnects mid-request cannot drop a transaction between its
//! balance write and its commit.

use std::future::Future;

use crate::error::AppError;

/// Admin endpoints
pub mod admin;
/// Liveness probe
pub mod health;
/// Gateway deposits and webhook
pub mod payments;
pub mod plans;
pub mod tasks;
/// Balance, history, withdrawals
pub mod wallet;

/// Run a unit of work on its own task and wait for it.
///
/// If the task panics the commit may or may not have happened, so the
/// caller is told to re-query instead of retrying.
pub(crate) async fn detached<T, F>(work: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(work).await.map_err(|err| {
        tracing::error!(error = %err, "detached operation did not finish");
        AppError::OutcomeUnknown
    })?
}
