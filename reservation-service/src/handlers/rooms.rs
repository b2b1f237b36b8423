//! Room CRUD handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use service_core::error::AppError;
use validator::Validate;

use crate::models::{CreateRoom, Room, UpdateRoom};
use crate::startup::AppState;

/// Create a new room.
pub async fn create_room(
    State(state): State<AppState>,
    Json(payload): Json<CreateRoom>,
) -> Result<(StatusCode, Json<Room>), AppError> {
    payload.validate()?;

    if payload.price_per_night < Decimal::ZERO {
        return Err(AppError::ValidationError(
            "price_per_night cannot be negative".to_string(),
        ));
    }

    let room = state.db.create_room(&payload).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

/// List all rooms.
pub async fn list_rooms(State(state): State<AppState>) -> Result<Json<Vec<Room>>, AppError> {
    Ok(Json(state.db.list_rooms().await?))
}

/// Get a room by ID.
pub async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<i32>,
) -> Result<Json<Room>, AppError> {
    let room = state
        .db
        .get_room(room_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Room {} not found", room_id)))?;
    Ok(Json(room))
}

/// Update a room.
pub async fn update_room(
    State(state): State<AppState>,
    Path(room_id): Path<i32>,
    Json(payload): Json<UpdateRoom>,
) -> Result<Json<Room>, AppError> {
    payload.validate()?;

    if matches!(payload.price_per_night, Some(price) if price < Decimal::ZERO) {
        return Err(AppError::ValidationError(
            "price_per_night cannot be negative".to_string(),
        ));
    }

    let room = state
        .db
        .update_room(room_id, &payload)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Room {} not found", room_id)))?;
    Ok(Json(room))
}

/// Delete a room.
pub async fn delete_room(
    State(state): State<AppState>,
    Path(room_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    if state.db.delete_room(room_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(anyhow::anyhow!(
            "Room {} not found",
            room_id
        )))
    }
}
