//! crates/kayak_rental_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or mail servers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    ContactInfo, Kayak, NewRental, NewUser, PasswordReset, Rental, RentalStatus,
    TransitionError, User, UserCredentials, UserUpdate,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// The request clashes with current state: duplicate email, last
    /// administrator, illegal status change.
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

impl From<TransitionError> for PortError {
    fn from(e: TransitionError) -> Self {
        PortError::Conflict(e.to_string())
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Management ---
    async fn count_users(&self) -> PortResult<u64>;

    /// Fails with `Conflict` when the email is taken.
    async fn create_user(&self, user: NewUser) -> PortResult<User>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn list_users(&self) -> PortResult<Vec<User>>;

    /// Fails with `Conflict` when the email is taken by another user or the
    /// update would demote the last administrator.
    async fn update_user(&self, user_id: Uuid, update: UserUpdate) -> PortResult<User>;

    /// Fails with `Conflict` when `user_id` is the last administrator.
    async fn delete_user(&self, user_id: Uuid) -> PortResult<()>;

    // --- Auth Methods ---
    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Returns the owner of a session that has not expired at `now`.
    async fn validate_auth_session(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    /// Deletes sessions and reset tokens that have expired at `now`.
    /// Returns how many rows were removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> PortResult<u64>;

    // --- Password Reset ---
    async fn create_password_reset(&self, reset: PasswordReset) -> PortResult<()>;

    async fn get_password_reset(&self, token: &str) -> PortResult<PasswordReset>;

    /// Replaces the password of the token's owner and consumes the token.
    /// Fails with `Unauthorized` when the token is unknown or expired at `now`.
    async fn complete_password_reset(
        &self,
        token: &str,
        hashed_password: &str,
        now: DateTime<Utc>,
    ) -> PortResult<()>;

    // --- Fleet ---
    async fn list_kayaks(&self) -> PortResult<Vec<Kayak>>;

    async fn get_kayak(&self, kayak_id: i32) -> PortResult<Kayak>;

    async fn create_kayak(&self, name: &str, is_stand_up_paddle: bool) -> PortResult<Kayak>;

    /// Inserts `roster` only when no kayaks exist yet. Returns how many were inserted.
    async fn seed_kayaks(&self, roster: &[Kayak]) -> PortResult<usize>;

    // --- Rentals ---
    /// Every decodable rental, oldest first. Undecodable rows are skipped.
    async fn list_rentals(&self) -> PortResult<Vec<Rental>>;

    async fn get_rental(&self, rental_id: Uuid) -> PortResult<Rental>;

    async fn create_rental(&self, rental: NewRental) -> PortResult<Rental>;

    /// Applies the status state machine; illegal moves fail with `Conflict`.
    async fn update_rental_status(
        &self,
        rental_id: Uuid,
        status: RentalStatus,
        contact_info: Option<ContactInfo>,
    ) -> PortResult<Rental>;
}

#[async_trait]
pub trait MailService: Send + Sync {
    /// Delivers a password reset link to `email`.
    async fn send_password_reset(&self, email: &str, reset_link: &str) -> PortResult<()>;
}
