//! Data models representing database entities and API payloads.

/// Access token identity model
pub mod access_token;
/// Wallet account model
pub mod account;
/// Ledger entries and balance-mutation requests
pub mod ledger;
pub mod notification;
pub mod payment;
pub mod plan;
pub mod salary;
pub mod task;
/// Payment gateway webhook payloads
pub mod webhook;
pub mod withdrawal;
