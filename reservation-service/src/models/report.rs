//! Reporting view rows and derived dashboard types.
//!
//! The view rows are read-only projections maintained by the database; the
//! derived types are recomputed in memory on every request and never
//! persisted.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

use crate::models::movement::{Movement, MovementKind};

/// Guest registry row: reservations joined with clients and rooms.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GuestRecord {
    pub client: String,
    pub document_id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub start_date: NaiveDate,
    /// None while the stay is ongoing.
    pub end_date: Option<NaiveDate>,
    pub room: String,
    pub room_type: String,
    pub reservation_status: String,
}

/// Room occupancy row: which rooms were occupied, when, and by whom.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OccupancyRecord {
    pub room: String,
    pub room_type: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub reservation_status: String,
    pub client: String,
}

/// Raw ledger aggregates for a window, straight from the store.
#[derive(Debug, Clone, FromRow)]
pub struct LedgerTotals {
    pub total_income: Decimal,
    pub income_count: i64,
    pub total_expense: Decimal,
    pub expense_count: i64,
}

/// Financial summary over a window. Averages are zero when the matching
/// count is zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinancialSummary {
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub net_balance: Decimal,
    pub income_count: i64,
    pub expense_count: i64,
    pub average_income: Decimal,
    pub average_expense: Decimal,
}

/// Financial health classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FinancialStatus {
    Positive,
    Negative,
}

impl FinancialStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Negative => "Negative",
        }
    }
}

impl std::fmt::Display for FinancialStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derived scalar indicators computed from the summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Kpis {
    pub financial_status: FinancialStatus,
    pub balance_ratio: Decimal,
    pub efficiency: Decimal,
}

/// One line of the recent-activity feed. Expense amounts are shown negated;
/// the stored movement keeps its non-negative amount.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    pub id: i32,
    pub kind: MovementKind,
    pub description: Option<String>,
    pub amount: Decimal,
    pub date: NaiveDate,
}

impl From<Movement> for ActivityEntry {
    fn from(movement: Movement) -> Self {
        let amount = match movement.kind {
            MovementKind::Income => movement.amount,
            MovementKind::Expense => -movement.amount,
        };
        Self {
            id: movement.id,
            kind: movement.kind,
            description: movement.description,
            amount,
            date: movement.date,
        }
    }
}

/// The reporting window a snapshot covers. Unbounded means entire history.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodDescriptor {
    pub label: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Full point-in-time dashboard result. Built fresh per request, consumed
/// read-only by every export encoding.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub period: PeriodDescriptor,
    pub summary: FinancialSummary,
    pub kpis: Kpis,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recent_movements: Vec<ActivityEntry>,
    pub generated_at: DateTime<Utc>,
}
