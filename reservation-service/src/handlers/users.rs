//! Staff user handlers: CRUD plus credential verification.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use validator::Validate;

use crate::models::{CreateUser, LoginRequest, Role, UpdateUser, User};
use crate::services::password;
use crate::startup::AppState;

/// Create a staff user. The password is hashed before it reaches the store.
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUser>,
) -> Result<(StatusCode, Json<User>), AppError> {
    payload.validate()?;

    if state.db.get_user_by_email(&payload.email).await?.is_some() {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "User with email '{}' already exists",
            payload.email
        )));
    }

    let password_hash = password::hash_password(&payload.password)?;
    let user = state.db.create_user(&payload, &password_hash).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// List all users.
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(state.db.list_users().await?))
}

/// List the available roles.
pub async fn list_roles(State(state): State<AppState>) -> Result<Json<Vec<Role>>, AppError> {
    Ok(Json(state.db.list_roles().await?))
}

/// Get a user by ID.
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> Result<Json<User>, AppError> {
    let user = state
        .db
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User {} not found", user_id)))?;
    Ok(Json(user))
}

/// Update a user. An empty or absent password leaves the hash unchanged.
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
    Json(payload): Json<UpdateUser>,
) -> Result<Json<User>, AppError> {
    payload.validate()?;

    let password_hash = match payload.password.as_deref() {
        Some(new_password) if !new_password.trim().is_empty() => {
            if new_password.len() < 6 {
                return Err(AppError::ValidationError(
                    "password must be at least 6 characters".to_string(),
                ));
            }
            Some(password::hash_password(new_password)?)
        }
        _ => None,
    };

    let user = state
        .db
        .update_user(user_id, &payload, password_hash.as_deref())
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User {} not found", user_id)))?;
    Ok(Json(user))
}

/// Delete a user.
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    if state.db.delete_user(user_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(anyhow::anyhow!(
            "User {} not found",
            user_id
        )))
    }
}

/// Verify credentials. The response never distinguishes a missing user from
/// a wrong password.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<User>, AppError> {
    let user = state
        .db
        .get_user_by_email(&payload.email)
        .await?
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Invalid credentials")))?;

    if !password::verify_password(&payload.password, &user.password_hash)? {
        return Err(AppError::Unauthorized(anyhow::anyhow!(
            "Invalid credentials"
        )));
    }

    tracing::info!(user_id = user.id, "User logged in");
    Ok(Json(user))
}
