//! Invoice and payment handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use service_core::error::AppError;

use crate::models::{CreateInvoice, CreatePayment, Invoice, Payment};
use crate::startup::AppState;

/// Issue an invoice for a reservation.
pub async fn create_invoice(
    State(state): State<AppState>,
    Json(payload): Json<CreateInvoice>,
) -> Result<(StatusCode, Json<Invoice>), AppError> {
    if payload.total < Decimal::ZERO {
        return Err(AppError::ValidationError(
            "total cannot be negative".to_string(),
        ));
    }

    let invoice = state.db.create_invoice(&payload).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

/// List invoices, most recent first.
pub async fn list_invoices(
    State(state): State<AppState>,
) -> Result<Json<Vec<Invoice>>, AppError> {
    Ok(Json(state.db.list_invoices().await?))
}

/// Get an invoice by ID.
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<i32>,
) -> Result<Json<Invoice>, AppError> {
    let invoice = state
        .db
        .get_invoice(invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice {} not found", invoice_id)))?;
    Ok(Json(invoice))
}

/// Void an issued invoice.
pub async fn void_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<i32>,
) -> Result<Json<Invoice>, AppError> {
    Ok(Json(state.db.void_invoice(invoice_id).await?))
}

/// Payment response carries the invoice as updated by the payment.
#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub payment: Payment,
    pub invoice: Invoice,
}

/// Register a payment against an invoice.
pub async fn create_payment(
    State(state): State<AppState>,
    Json(payload): Json<CreatePayment>,
) -> Result<(StatusCode, Json<PaymentResponse>), AppError> {
    let (payment, invoice) = state.db.record_payment(&payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(PaymentResponse { payment, invoice }),
    ))
}

/// List payments registered against an invoice.
pub async fn list_invoice_payments(
    State(state): State<AppState>,
    Path(invoice_id): Path<i32>,
) -> Result<Json<Vec<Payment>>, AppError> {
    if state.db.get_invoice(invoice_id).await?.is_none() {
        return Err(AppError::NotFound(anyhow::anyhow!(
            "Invoice {} not found",
            invoice_id
        )));
    }
    Ok(Json(state.db.list_payments(invoice_id).await?))
}
