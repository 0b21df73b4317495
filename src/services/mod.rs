//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! [`ledger`] is the only module that writes balances; every other service
//! composes its `*_tx` functions with its own table writes inside a single
//! unit of work.

pub mod account_service;
pub mod ledger;
pub mod notification_service;
pub mod payment_service;
pub mod plan_service;
pub mod retry;
pub mod salary_service;
pub mod task_service;
pub mod withdrawal_service;
