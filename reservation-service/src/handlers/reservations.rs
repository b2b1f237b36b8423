//! Reservation CRUD handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

use crate::models::{CreateReservation, Reservation, UpdateReservation};
use crate::startup::AppState;

/// Create a reservation. Date order is checked before touching the store;
/// client/room existence and overlap are validated against it.
pub async fn create_reservation(
    State(state): State<AppState>,
    Json(payload): Json<CreateReservation>,
) -> Result<(StatusCode, Json<Reservation>), AppError> {
    if let Some(end) = payload.end_date {
        if payload.start_date > end {
            return Err(AppError::ValidationError(
                "start date cannot be later than end date".to_string(),
            ));
        }
    }

    let reservation = state.db.create_reservation(&payload).await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

/// List reservations, most recent stay first.
pub async fn list_reservations(
    State(state): State<AppState>,
) -> Result<Json<Vec<Reservation>>, AppError> {
    Ok(Json(state.db.list_reservations().await?))
}

/// Get a reservation by ID.
pub async fn get_reservation(
    State(state): State<AppState>,
    Path(reservation_id): Path<i32>,
) -> Result<Json<Reservation>, AppError> {
    let reservation = state
        .db
        .get_reservation(reservation_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Reservation {} not found", reservation_id))
        })?;
    Ok(Json(reservation))
}

/// Update a reservation.
pub async fn update_reservation(
    State(state): State<AppState>,
    Path(reservation_id): Path<i32>,
    Json(payload): Json<UpdateReservation>,
) -> Result<Json<Reservation>, AppError> {
    if let (Some(start), Some(end)) = (payload.start_date, payload.end_date) {
        if start > end {
            return Err(AppError::ValidationError(
                "start date cannot be later than end date".to_string(),
            ));
        }
    }

    let reservation = state
        .db
        .update_reservation(reservation_id, &payload)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Reservation {} not found", reservation_id))
        })?;
    Ok(Json(reservation))
}

/// Delete a reservation.
pub async fn delete_reservation(
    State(state): State<AppState>,
    Path(reservation_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    if state.db.delete_reservation(reservation_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(anyhow::anyhow!(
            "Reservation {} not found",
            reservation_id
        )))
    }
}
