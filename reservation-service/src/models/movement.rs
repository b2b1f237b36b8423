//! Ledger movement model.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Movement kind (income or expense).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    Income,
    Expense,
}

impl MovementKind {
    /// Get string representation for database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    /// Human-readable label for tabular exports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Income => "Income",
            Self::Expense => "Expense",
        }
    }

    /// Parse a caller-supplied kind token.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "income" => Some(Self::Income),
            "expense" => Some(Self::Expense),
            _ => None,
        }
    }
}

impl std::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Single ledger movement. Immutable once written; amounts are stored
/// non-negative regardless of kind.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Movement {
    pub id: i32,
    pub date: NaiveDate,
    pub kind: MovementKind,
    pub description: Option<String>,
    pub amount: Decimal,
}

/// Input for recording a movement. The kind comes from the route.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMovement {
    pub date: NaiveDate,
    pub description: Option<String>,
    pub amount: Decimal,
}
