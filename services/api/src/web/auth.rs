//! services/api/src/web/auth.rs
//!
//! Authentication endpoints: signup, login, logout, the current user, and the
//! password reset flow.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use argon2::{
    password_hash::{
        rand_core::{OsRng, RngCore},
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    },
    Argon2,
};
use chrono::Duration;
use kayak_rental_core::domain::{NewUser, PasswordReset, Role};
use kayak_rental_core::ports::{DatabaseService, PortError, PortResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use utoipa::{IntoParams, ToSchema};

use crate::config::BootstrapAdmin;
use crate::error::{port_rejection, Rejection};
use crate::web::middleware::{session_id_from_headers, AuthUser};
use crate::web::protocol::UserResponse;
use crate::web::state::AppState;

pub const SESSION_DAYS: i64 = 30;
pub const RESET_TOKEN_HOURS: i64 = 1;
pub const MIN_PASSWORD_LEN: usize = 8;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ResetTokenQuery {
    pub token: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct TokenValidityResponse {
    pub valid: bool,
}

//=========================================================================================
// Helpers
//=========================================================================================

/// Hashes a password with Argon2 and a fresh salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

fn verify_password(password: &str, hashed: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hashed)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Like `hash_password`, mapped to a handler rejection.
pub(crate) fn hash_for_request(password: &str) -> Result<String, Rejection> {
    hash_password(password).map_err(|e| {
        error!("Failed to hash password: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to hash password".to_string())
    })
}

/// Trims and lowercases an email, rejecting anything without a local part and a domain.
pub(crate) fn normalize_email(email: &str) -> Result<String, Rejection> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err((StatusCode::BAD_REQUEST, "Invalid email address".to_string())),
    }
}

pub(crate) fn check_password(password: &str) -> Result<(), Rejection> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }
    Ok(())
}

pub(crate) fn check_name(name: &str) -> Result<String, Rejection> {
    let name = name.trim();
    if name.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Name is required".to_string()));
    }
    Ok(name.to_string())
}

/// 64 hex characters from the OS random source.
fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Drops expired sessions and reset tokens. Failure only delays the cleanup.
async fn purge_expired(state: &AppState) {
    match state.db.purge_expired(state.now()).await {
        Ok(0) => {}
        Ok(removed) => debug!("Purged {} expired sessions and reset tokens", removed),
        Err(e) => warn!("Failed to purge expired sessions: {:?}", e),
    }
}

/// Creates an auth session for `user_id` and returns the `Set-Cookie` value.
async fn start_session(state: &AppState, user_id: uuid::Uuid) -> Result<String, Rejection> {
    purge_expired(state).await;
    let auth_session_id = uuid::Uuid::new_v4().to_string();
    let expires_at = state.now() + Duration::days(SESSION_DAYS);

    state
        .db
        .create_auth_session(&auth_session_id, user_id, expires_at)
        .await
        .map_err(|e| {
            error!("Failed to create auth session: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to create session".to_string())
        })?;

    Ok(format!(
        "session={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        auth_session_id,
        Duration::days(SESSION_DAYS).num_seconds()
    ))
}

/// Creates the configured administrator when the store has no users at all.
/// Returns whether an account was created.
pub async fn ensure_bootstrap_admin(
    db: &dyn DatabaseService,
    admin: &BootstrapAdmin,
) -> PortResult<bool> {
    if db.count_users().await? > 0 {
        return Ok(false);
    }
    let hashed_password =
        hash_password(&admin.password).map_err(|e| PortError::Unexpected(e.to_string()))?;
    let user = db
        .create_user(NewUser {
            name: admin.name.clone(),
            email: admin.email.trim().to_lowercase(),
            role: Role::Admin,
            hashed_password,
        })
        .await?;
    info!("Created bootstrap administrator {}", user.email);
    Ok(true)
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a new employee account
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = UserResponse),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Self-service signup is disabled"),
        (status = 409, description = "Email already registered"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, Rejection> {
    if !state.config.allow_signup {
        return Err((StatusCode::FORBIDDEN, "Signup is disabled".to_string()));
    }

    // 1. Validate and hash
    let name = check_name(&req.name)?;
    let email = normalize_email(&req.email)?;
    check_password(&req.password)?;
    let hashed_password = hash_for_request(&req.password)?;

    // 2. Create user in database
    let user = state
        .db
        .create_user(NewUser {
            name,
            email,
            role: Role::Employee,
            hashed_password,
        })
        .await
        .map_err(|e| {
            warn!("Failed to create user: {:?}", e);
            port_rejection(e, "Failed to create user")
        })?;

    // 3. Log the new user in
    let cookie = start_session(&state, user.user_id).await?;
    info!("New employee signed up: {}", user.email);

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(UserResponse::from(user)),
    ))
}

/// POST /auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = UserResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, Rejection> {
    let invalid = || (StatusCode::UNAUTHORIZED, "Invalid email or password".to_string());

    // 1. Get user by email
    let email = req.email.trim().to_lowercase();
    let user_creds = state.db.get_user_by_email(&email).await.map_err(|e| match e {
        PortError::NotFound(_) => {
            info!("Login attempt for unknown email");
            invalid()
        }
        other => {
            error!("Failed to get user: {:?}", other);
            (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error".to_string())
        }
    })?;

    // 2. Verify password
    let valid = verify_password(&req.password, &user_creds.hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Authentication error".to_string())
    })?;
    if !valid {
        info!("Wrong password for {}", user_creds.user.email);
        return Err(invalid());
    }

    // 3. Create auth session and cookie
    let cookie = start_session(&state, user_creds.user.user_id).await?;

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(UserResponse::from(user_creds.user)),
    ))
}

/// POST /auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, Rejection> {
    // 1. Extract session ID from cookie
    let auth_session_id = session_id_from_headers(&headers)
        .ok_or((StatusCode::UNAUTHORIZED, "No session found".to_string()))?;

    // 2. Delete auth session from database
    state
        .db
        .delete_auth_session(auth_session_id)
        .await
        .map_err(|e| {
            error!("Failed to delete auth session: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to logout".to_string())
        })?;

    // 3. Clear cookie
    let cookie = "session=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0";

    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie.to_string())]))
}

/// GET /auth/me - The logged-in user
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
) -> Result<Json<UserResponse>, Rejection> {
    let user = state.db.get_user_by_id(caller.user_id).await.map_err(|e| {
        error!("Failed to load current user: {:?}", e);
        port_rejection(e, "Failed to load user")
    })?;
    Ok(Json(user.into()))
}

/// POST /auth/forgot-password - Email a password reset link
#[utoipa::path(
    post,
    path = "/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset link sent", body = MessageResponse),
        (status = 404, description = "No account with this email")
    )
)]
pub async fn forgot_password_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, Rejection> {
    let email = normalize_email(&req.email)?;
    let creds = state.db.get_user_by_email(&email).await.map_err(|e| {
        info!("Password reset requested for unknown email");
        port_rejection(e, "Failed to process the request")
    })?;

    purge_expired(&state).await;
    let reset = PasswordReset {
        token: generate_reset_token(),
        user_id: creds.user.user_id,
        expires_at: state.now() + Duration::hours(RESET_TOKEN_HOURS),
    };
    let link = format!(
        "{}/reset-password?token={}",
        state.config.public_base_url, reset.token
    );

    state.db.create_password_reset(reset).await.map_err(|e| {
        error!("Failed to store reset token: {:?}", e);
        port_rejection(e, "Failed to process the request")
    })?;
    state
        .mailer
        .send_password_reset(&creds.user.email, &link)
        .await
        .map_err(|e| {
            error!("Failed to send reset email: {:?}", e);
            port_rejection(e, "Failed to send the reset email")
        })?;

    Ok(Json(MessageResponse {
        message: "A reset link has been sent to your email".to_string(),
    }))
}

/// GET /auth/verify-reset-token - Check a reset token before showing the form
#[utoipa::path(
    get,
    path = "/auth/verify-reset-token",
    params(ResetTokenQuery),
    responses(
        (status = 200, description = "Token is valid", body = TokenValidityResponse),
        (status = 401, description = "Token is invalid or expired")
    )
)]
pub async fn verify_reset_token_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ResetTokenQuery>,
) -> Result<Json<TokenValidityResponse>, Rejection> {
    let invalid = || (StatusCode::UNAUTHORIZED, "Invalid or expired token".to_string());
    let reset = state
        .db
        .get_password_reset(&query.token)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => invalid(),
            other => {
                error!("Failed to look up reset token: {:?}", other);
                port_rejection(other, "Failed to verify token")
            }
        })?;
    if reset.expires_at <= state.now() {
        return Err(invalid());
    }
    Ok(Json(TokenValidityResponse { valid: true }))
}

/// POST /auth/reset-password - Set a new password with a reset token
#[utoipa::path(
    post,
    path = "/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Password too short"),
        (status = 401, description = "Token is invalid or expired")
    )
)]
pub async fn reset_password_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, Rejection> {
    check_password(&req.password)?;
    let hashed_password = hash_for_request(&req.password)?;

    state
        .db
        .complete_password_reset(&req.token, &hashed_password, state.now())
        .await
        .map_err(|e| match e {
            PortError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "Invalid or expired token".to_string())
            }
            other => {
                error!("Failed to reset password: {:?}", other);
                port_rejection(other, "Failed to reset password")
            }
        })?;

    Ok(Json(MessageResponse {
        message: "Password has been reset".to_string(),
    }))
}
