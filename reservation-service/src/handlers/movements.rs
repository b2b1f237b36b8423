//! Income and expense ledger handlers.
//!
//! The routes keep the legacy `/ingresos` and `/egresos` split; both write
//! the single movements relation with the matching kind.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use service_core::error::AppError;

use crate::models::{CreateMovement, Movement, MovementKind};
use crate::services::reports::DateRange;
use crate::startup::AppState;

/// Optional window for movement listings; parameter names are the legacy
/// Spanish ones the frontend sends.
#[derive(Debug, Deserialize)]
pub struct MovementWindow {
    #[serde(rename = "fecha_inicio")]
    start_date: Option<NaiveDate>,
    #[serde(rename = "fecha_fin")]
    end_date: Option<NaiveDate>,
}

async fn create(
    state: AppState,
    kind: MovementKind,
    payload: CreateMovement,
) -> Result<(StatusCode, Json<Movement>), AppError> {
    if payload.amount < Decimal::ZERO {
        return Err(AppError::ValidationError(
            "amount cannot be negative".to_string(),
        ));
    }

    let movement = state.db.record_movement(kind, &payload).await?;
    Ok((StatusCode::CREATED, Json(movement)))
}

async fn list(
    state: AppState,
    kind: MovementKind,
    window: MovementWindow,
) -> Result<Json<Vec<Movement>>, AppError> {
    let range = DateRange::new(window.start_date, window.end_date)?;
    Ok(Json(state.db.fetch_movements(&range, Some(kind)).await?))
}

async fn get(
    state: AppState,
    kind: MovementKind,
    movement_id: i32,
) -> Result<Json<Movement>, AppError> {
    let movement = state
        .db
        .get_movement(movement_id, kind)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!(
                "{} {} not found",
                kind.label(),
                movement_id
            ))
        })?;
    Ok(Json(movement))
}

async fn delete(state: AppState, kind: MovementKind, movement_id: i32) -> Result<StatusCode, AppError> {
    if state.db.delete_movement(movement_id, kind).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(anyhow::anyhow!(
            "{} {} not found",
            kind.label(),
            movement_id
        )))
    }
}

pub async fn create_income(
    State(state): State<AppState>,
    Json(payload): Json<CreateMovement>,
) -> Result<(StatusCode, Json<Movement>), AppError> {
    create(state, MovementKind::Income, payload).await
}

pub async fn list_incomes(
    State(state): State<AppState>,
    Query(window): Query<MovementWindow>,
) -> Result<Json<Vec<Movement>>, AppError> {
    list(state, MovementKind::Income, window).await
}

pub async fn get_income(
    State(state): State<AppState>,
    Path(movement_id): Path<i32>,
) -> Result<Json<Movement>, AppError> {
    get(state, MovementKind::Income, movement_id).await
}

pub async fn delete_income(
    State(state): State<AppState>,
    Path(movement_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    delete(state, MovementKind::Income, movement_id).await
}

pub async fn create_expense(
    State(state): State<AppState>,
    Json(payload): Json<CreateMovement>,
) -> Result<(StatusCode, Json<Movement>), AppError> {
    create(state, MovementKind::Expense, payload).await
}

pub async fn list_expenses(
    State(state): State<AppState>,
    Query(window): Query<MovementWindow>,
) -> Result<Json<Vec<Movement>>, AppError> {
    list(state, MovementKind::Expense, window).await
}

pub async fn get_expense(
    State(state): State<AppState>,
    Path(movement_id): Path<i32>,
) -> Result<Json<Movement>, AppError> {
    get(state, MovementKind::Expense, movement_id).await
}

pub async fn delete_expense(
    State(state): State<AppState>,
    Path(movement_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    delete(state, MovementKind::Expense, movement_id).await
}
