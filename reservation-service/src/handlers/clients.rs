//! Client (guest) CRUD handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use validator::Validate;

use crate::models::{Client, CreateClient, UpdateClient};
use crate::startup::AppState;

/// Create a new client.
pub async fn create_client(
    State(state): State<AppState>,
    Json(payload): Json<CreateClient>,
) -> Result<(StatusCode, Json<Client>), AppError> {
    payload.validate()?;

    if let Some(existing) = state.db.get_client_by_document(&payload.document_id).await? {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Client with document '{}' already exists (id {})",
            payload.document_id,
            existing.id
        )));
    }

    let client = state.db.create_client(&payload).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

/// List all clients.
pub async fn list_clients(
    State(state): State<AppState>,
) -> Result<Json<Vec<Client>>, AppError> {
    Ok(Json(state.db.list_clients().await?))
}

/// Get a client by ID.
pub async fn get_client(
    State(state): State<AppState>,
    Path(client_id): Path<i32>,
) -> Result<Json<Client>, AppError> {
    let client = state
        .db
        .get_client(client_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Client {} not found", client_id)))?;
    Ok(Json(client))
}

/// Update a client.
pub async fn update_client(
    State(state): State<AppState>,
    Path(client_id): Path<i32>,
    Json(payload): Json<UpdateClient>,
) -> Result<Json<Client>, AppError> {
    payload.validate()?;

    let client = state
        .db
        .update_client(client_id, &payload)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Client {} not found", client_id)))?;
    Ok(Json(client))
}

/// Delete a client.
pub async fn delete_client(
    State(state): State<AppState>,
    Path(client_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    if state.db.delete_client(client_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(anyhow::anyhow!(
            "Client {} not found",
            client_id
        )))
    }
}
