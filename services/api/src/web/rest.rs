//! services/api/src/web/rest.rs
//!
//! Assembles the REST router and holds the master definition for the OpenAPI
//! document.

use crate::web::{auth, kayaks, middleware::require_auth, rentals, reports, state::AppState, users};
use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::me_handler,
        auth::forgot_password_handler,
        auth::verify_reset_token_handler,
        auth::reset_password_handler,
        kayaks::list_kayaks_handler,
        kayaks::create_kayak_handler,
        rentals::list_rentals_handler,
        rentals::active_rentals_handler,
        rentals::create_rental_handler,
        rentals::update_rental_handler,
        reports::report_summary_handler,
        users::list_users_handler,
        users::create_user_handler,
        users::update_user_handler,
        users::delete_user_handler,
    ),
    components(
        schemas(
            crate::web::protocol::RoleTag,
            crate::web::protocol::RentalTypeTag,
            crate::web::protocol::PaymentMethodTag,
            crate::web::protocol::RentalStatusTag,
            crate::web::protocol::ContactInfoBody,
            crate::web::protocol::UserResponse,
            crate::web::protocol::RentalResponse,
            auth::SignupRequest,
            auth::LoginRequest,
            auth::ForgotPasswordRequest,
            auth::ResetPasswordRequest,
            auth::MessageResponse,
            auth::TokenValidityResponse,
            kayaks::KayakResponse,
            kayaks::CreateKayakRequest,
            rentals::CreateRentalRequest,
            rentals::UpdateRentalRequest,
            rentals::ActiveRentalResponse,
            reports::BucketResponse,
            reports::ByTypeResponse,
            reports::ByPaymentResponse,
            reports::WindowResponse,
            reports::ReportResponse,
            users::CreateUserRequest,
            users::UpdateUserRequest,
        )
    ),
    tags(
        (name = "Kayak Rental API", description = "Rental registration, fleet status and revenue reports for the front desk.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Router
//=========================================================================================

/// Builds the API router. Everything except the login and password reset
/// flow sits behind the session cookie.
pub fn router(state: Arc<AppState>, cors: CorsLayer) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(auth::signup_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/auth/forgot-password", post(auth::forgot_password_handler))
        .route("/auth/verify-reset-token", get(auth::verify_reset_token_handler))
        .route("/auth/reset-password", post(auth::reset_password_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route(
            "/kayaks",
            get(kayaks::list_kayaks_handler).post(kayaks::create_kayak_handler),
        )
        .route(
            "/rentals",
            get(rentals::list_rentals_handler).post(rentals::create_rental_handler),
        )
        .route("/rentals/active", get(rentals::active_rentals_handler))
        .route("/rentals/{id}", patch(rentals::update_rental_handler))
        .route("/reports/summary", get(reports::report_summary_handler))
        .route(
            "/users",
            get(users::list_users_handler).post(users::create_user_handler),
        )
        .route(
            "/users/{id}",
            patch(users::update_user_handler).delete(users::delete_user_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .with_state(state)
}
