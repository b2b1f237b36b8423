//! Reporting and export endpoints.
//!
//! Filter validation always happens before any query; a store failure at any
//! point aborts the whole request, so no partial dashboard is ever returned.

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use service_core::error::AppError;

use crate::models::{DashboardSnapshot, GuestRecord, Movement, MovementKind, OccupancyRecord};
use crate::services::export::{self, ExportFormat};
use crate::services::metrics::EXPORTS_TOTAL;
use crate::services::reports::{DateRange, GuestFilter, OccupancyFilter, Period};
use crate::startup::AppState;

/// Query parameters for the daily ledger. The wire names are the legacy
/// Spanish ones the frontend sends.
#[derive(Debug, Deserialize)]
pub struct LedgerQuery {
    #[serde(rename = "fecha_inicio")]
    start_date: Option<NaiveDate>,
    #[serde(rename = "fecha_fin")]
    end_date: Option<NaiveDate>,
    #[serde(rename = "tipo")]
    kind: Option<String>,
}

/// Daily ledger: every movement in the window, most recent first.
pub async fn daily_ledger(
    State(state): State<AppState>,
    Query(query): Query<LedgerQuery>,
) -> Result<Json<Vec<Movement>>, AppError> {
    let range = DateRange::new(query.start_date, query.end_date)?;
    let kind = query.kind.as_deref().map(parse_kind).transpose()?;
    Ok(Json(state.db.fetch_movements(&range, kind).await?))
}

fn parse_kind(token: &str) -> Result<MovementKind, AppError> {
    MovementKind::parse(token).ok_or_else(|| {
        AppError::ValidationError(format!(
            "Unknown movement kind '{}'. Use: income, expense",
            token
        ))
    })
}

#[derive(Debug, Deserialize)]
pub struct GuestQuery {
    #[serde(rename = "fecha_inicio")]
    start_date: Option<NaiveDate>,
    #[serde(rename = "fecha_fin")]
    end_date: Option<NaiveDate>,
    #[serde(rename = "documento_identidad")]
    document_id: Option<String>,
    #[serde(rename = "nombre_cliente")]
    client_name: Option<String>,
}

/// Guest registry: who stayed, when, and in which room.
pub async fn guest_registry(
    State(state): State<AppState>,
    Query(query): Query<GuestQuery>,
) -> Result<Json<Vec<GuestRecord>>, AppError> {
    let filter = GuestFilter {
        range: DateRange::new(query.start_date, query.end_date)?,
        document_id: query.document_id,
        client_name: query.client_name,
    };
    Ok(Json(state.db.fetch_guest_records(&filter).await?))
}

#[derive(Debug, Deserialize)]
pub struct OccupancyQuery {
    #[serde(rename = "fecha_inicio")]
    start_date: Option<NaiveDate>,
    #[serde(rename = "fecha_fin")]
    end_date: Option<NaiveDate>,
    #[serde(rename = "numero_habitacion")]
    room_number: Option<String>,
    #[serde(rename = "tipo_habitacion")]
    room_type: Option<String>,
}

/// Room occupancy: which rooms were occupied, when, and by whom.
pub async fn room_occupancy(
    State(state): State<AppState>,
    Query(query): Query<OccupancyQuery>,
) -> Result<Json<Vec<OccupancyRecord>>, AppError> {
    let filter = OccupancyFilter {
        range: DateRange::new(query.start_date, query.end_date)?,
        room_number: query.room_number,
        room_type: query.room_type,
    };
    Ok(Json(state.db.fetch_occupancy_records(&filter).await?))
}

/// Live dashboard over the entire history.
pub async fn dashboard(
    State(state): State<AppState>,
) -> Result<Json<DashboardSnapshot>, AppError> {
    Ok(Json(state.reports.dashboard().await?))
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    #[serde(rename = "formato")]
    format: Option<String>,
    #[serde(rename = "periodo")]
    period: Option<String>,
    #[serde(rename = "incluir_movimientos")]
    include_movements: Option<bool>,
}

/// Export the dashboard as a downloadable file.
pub async fn export_dashboard(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, AppError> {
    // Both tokens are checked before a single query executes.
    let format = ExportFormat::parse(query.format.as_deref().unwrap_or("structured"))?;
    let period = Period::parse(query.period.as_deref().unwrap_or("all"))?;
    let include_movements = query.include_movements.unwrap_or(true);

    let snapshot = state.reports.export_snapshot(period, include_movements).await?;
    let file = export::render(&snapshot, format)?;

    EXPORTS_TOTAL.with_label_values(&[format.as_str()]).inc();
    tracing::info!(
        format = format.as_str(),
        period = ?period,
        bytes = file.payload.len(),
        "Dashboard exported"
    );

    let headers = [
        (header::CONTENT_TYPE, file.media_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={}", file.filename),
        ),
    ];
    Ok((headers, file.payload))
}
