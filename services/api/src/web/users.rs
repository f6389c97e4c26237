//! services/api/src/web/users.rs
//!
//! User administration. The last-administrator rule is enforced by the
//! database port, not here, so every path that removes an administrator is
//! covered.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use kayak_rental_core::domain::{Capability, NewUser, UserUpdate};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{port_rejection, Rejection};
use crate::web::auth::{check_name, check_password, hash_for_request, normalize_email};
use crate::web::middleware::AuthUser;
use crate::web::protocol::{RoleTag, UserResponse};
use crate::web::state::AppState;

#[derive(Deserialize, ToSchema, Debug)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: RoleTag,
}

#[derive(Deserialize, ToSchema, Debug)]
pub struct UpdateUserRequest {
    pub name: String,
    pub email: String,
    pub role: RoleTag,
    /// Replaces the password when present and non-empty.
    pub password: Option<String>,
}

#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "All users", body = [UserResponse]),
        (status = 403, description = "Caller may not manage users")
    )
)]
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
) -> Result<Json<Vec<UserResponse>>, Rejection> {
    caller.ensure(Capability::ManageUsers)?;
    let users = state.db.list_users().await.map_err(|e| {
        error!("Failed to list users: {:?}", e);
        port_rejection(e, "Failed to load users")
    })?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn create_user_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), Rejection> {
    caller.ensure(Capability::ManageUsers)?;
    let name = check_name(&req.name)?;
    let email = normalize_email(&req.email)?;
    check_password(&req.password)?;
    let hashed_password = hash_for_request(&req.password)?;

    let user = state
        .db
        .create_user(NewUser {
            name,
            email,
            role: req.role.into(),
            hashed_password,
        })
        .await
        .map_err(|e| {
            warn!("Failed to create user: {:?}", e);
            port_rejection(e, "Failed to create user")
        })?;

    info!("User {} created {} as {}", caller.user_id, user.email, user.role.as_str());
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[utoipa::path(
    patch,
    path = "/users/{id}",
    request_body = UpdateUserRequest,
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 404, description = "Unknown user"),
        (status = 409, description = "Email taken, or last administrator")
    )
)]
pub async fn update_user_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, Rejection> {
    caller.ensure(Capability::ManageUsers)?;
    let name = check_name(&req.name)?;
    let email = normalize_email(&req.email)?;
    let hashed_password = match req.password.as_deref().filter(|p| !p.is_empty()) {
        Some(password) => {
            check_password(password)?;
            Some(hash_for_request(password)?)
        }
        None => None,
    };

    let user = state
        .db
        .update_user(
            user_id,
            UserUpdate {
                name,
                email,
                role: req.role.into(),
                hashed_password,
            },
        )
        .await
        .map_err(|e| {
            warn!("Failed to update user {}: {:?}", user_id, e);
            port_rejection(e, "Failed to update user")
        })?;

    Ok(Json(user.into()))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "Unknown user"),
        (status = 409, description = "Last administrator")
    )
)]
pub async fn delete_user_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, Rejection> {
    caller.ensure(Capability::ManageUsers)?;
    state.db.delete_user(user_id).await.map_err(|e| {
        warn!("Failed to delete user {}: {:?}", user_id, e);
        port_rejection(e, "Failed to delete user")
    })?;
    info!("User {} deleted user {}", caller.user_id, user_id);
    Ok(StatusCode::NO_CONTENT)
}
