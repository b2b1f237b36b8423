//! Invoice and payment models.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Invoice status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Issued,
    Paid,
    Void,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Issued => "issued",
            Self::Paid => "paid",
            Self::Void => "void",
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Card => "card",
            Self::Transfer => "transfer",
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i32,
    pub reservation_id: i32,
    pub client_id: i32,
    pub issued_date: NaiveDate,
    pub total: Decimal,
    pub status: InvoiceStatus,
}

/// Input for issuing an invoice. The client is derived from the reservation.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateInvoice {
    pub reservation_id: i32,
    pub total: Decimal,
    pub issued_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: i32,
    pub invoice_id: i32,
    pub paid_date: NaiveDate,
    pub amount: Decimal,
    pub method: PaymentMethod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePayment {
    pub invoice_id: i32,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub paid_date: Option<NaiveDate>,
}
