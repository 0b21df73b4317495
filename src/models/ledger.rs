//! Ledger entry data models and balance-mutation request types.
//!
//! This module defines:
//! - `LedgerEntry`: one row of the append-only transaction log
//! - `EntryKind` / `EntryStatus`: the tagged variants stored with each entry
//! - `CreditRequest`, `DebitRequest`, `RefundRequest`: typed inputs to the
//!   balance mutator
//! - `LedgerEntryResponse`, `LedgerPage`: response bodies returned to clients

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::Money;

/// Which way an entry moves the balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Credit,
    Debit,
}

/// What caused a balance change.
///
/// Maps to the `ledger_kind` PostgreSQL enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ledger_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Deposit,
    Withdrawal,
    TaskReward,
    PlanPurchase,
    ReferralBonus,
    Refund,
}

impl EntryKind {
    pub fn direction(self) -> Direction {
        match self {
            EntryKind::Deposit
            | EntryKind::TaskReward
            | EntryKind::ReferralBonus
            | EntryKind::Refund => Direction::Credit,
            EntryKind::Withdrawal | EntryKind::PlanPurchase => Direction::Debit,
        }
    }

    /// Credits of this kind count towards `total_earned`.
    ///
    /// Deposits are the user's own money and refunds only return a hold, so
    /// neither is an earning.
    pub fn is_earning(self) -> bool {
        matches!(self, EntryKind::TaskReward | EntryKind::ReferralBonus)
    }

    /// Status an entry of this kind is written with.
    ///
    /// A withdrawal debit is a hold awaiting an admin decision; every other
    /// movement is final at the moment it commits.
    pub fn initial_status(self) -> EntryStatus {
        match self {
            EntryKind::Withdrawal => EntryStatus::Pending,
            _ => EntryStatus::Success,
        }
    }
}

/// Lifecycle of a ledger entry.
///
/// Only `pending -> success` and `pending -> failed` (plus `success -> failed`
/// for a refunded plan purchase) ever happen after insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ledger_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Pending,
    Success,
    Failed,
}

/// Represents a row of the `ledger_entries` table.
///
/// # Invariant
///
/// `balance_after = balance_before + amount` for credit kinds and
/// `balance_after = balance_before - amount` for debit kinds, both captured
/// while the account row was locked. For one account, ordering by `sequence`
/// yields a chain in which each `balance_before` equals the previous
/// `balance_after`.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct LedgerEntry {
    pub id: Uuid,

    /// Insertion order. Inserts for one account are serialized by the
    /// account row lock, so this is also commit order per account.
    pub sequence: i64,

    pub account_id: Uuid,
    pub kind: EntryKind,

    /// Always positive; the direction comes from `kind`.
    pub amount: Money,

    pub balance_before: Money,
    pub balance_after: Money,
    pub status: EntryStatus,
    pub description: String,

    /// External payment id for deposits, original entry id for refunds.
    pub reference_id: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Whether `balance_after` follows from `balance_before` and `amount`.
    pub fn is_consistent(&self) -> bool {
        let expected = match self.kind.direction() {
            Direction::Credit => self.balance_before.checked_add(self.amount),
            Direction::Debit => self.balance_before.checked_sub(self.amount),
        };
        expected == Some(self.balance_after)
    }
}

/// Input to [`crate::services::ledger::credit_tx`].
#[derive(Debug, Clone)]
pub struct CreditRequest {
    pub account_id: Uuid,
    pub amount: Money,
    pub kind: EntryKind,
    pub description: String,
    pub reference_id: Option<String>,
}

/// Input to [`crate::services::ledger::debit_tx`].
#[derive(Debug, Clone)]
pub struct DebitRequest {
    pub account_id: Uuid,
    pub amount: Money,
    pub kind: EntryKind,
    pub description: String,
    pub reference_id: Option<String>,
}

/// Input to [`crate::services::ledger::refund_tx`].
#[derive(Debug, Clone)]
pub struct RefundRequest {
    pub account_id: Uuid,
    pub amount: Money,
    pub original_entry_id: Uuid,
    pub reason: String,
}

/// Ledger entry as returned to API clients.
///
/// # JSON Example
///
/// ```json
/// {
///   "id": "770e8400-e29b-41d4-a716-446655440002",
///   "kind": "withdrawal",
///   "amount": "500.00",
///   "balance_before": "1000.00",
///   "balance_after": "500.00",
///   "status": "pending",
///   "description": "Withdrawal request",
///   "reference_id": null,
///   "created_at": "2025-12-21T16:00:00Z"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct LedgerEntryResponse {
    pub id: Uuid,
    pub kind: EntryKind,
    pub amount: Money,
    pub balance_before: Money,
    pub balance_after: Money,
    pub status: EntryStatus,
    pub description: String,
    pub reference_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<LedgerEntry> for LedgerEntryResponse {
    fn from(entry: LedgerEntry) -> Self {
        Self {
            id: entry.id,
            kind: entry.kind,
            amount: entry.amount,
            balance_before: entry.balance_before,
            balance_after: entry.balance_after,
            status: entry.status,
            description: entry.description,
            reference_id: entry.reference_id,
            created_at: entry.created_at,
        }
    }
}

/// Query string for the transaction history endpoint.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_records: i64,
    pub limit: u32,
}

/// One page of ledger history, newest first.
#[derive(Debug, Serialize)]
pub struct LedgerPage {
    pub entries: Vec<LedgerEntryResponse>,
    pub pagination: Pagination,
}
