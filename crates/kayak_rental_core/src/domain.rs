//! crates/kayak_rental_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Equipment
//=========================================================================================

/// A piece of rentable equipment. Availability is never stored on the kayak
/// itself; see `reporting::availability`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kayak {
    pub id: i32,
    pub name: String,
    pub is_stand_up_paddle: bool,
}

/// The roster inserted into an empty store at startup.
pub fn default_roster() -> Vec<Kayak> {
    let mut roster: Vec<Kayak> = (1..=10)
        .map(|id| Kayak {
            id,
            name: format!("Kayak {}", id),
            is_stand_up_paddle: false,
        })
        .collect();
    roster.push(Kayak {
        id: 11,
        name: "Stand Up Paddle".to_string(),
        is_stand_up_paddle: true,
    });
    roster
}

//=========================================================================================
// Rentals
//=========================================================================================

/// Error returned when a tag read from storage or a request is not one of the known values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseTagError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseTagError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RentalType {
    Simple,
    Double,
}

impl RentalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RentalType::Simple => "simple",
            RentalType::Double => "double",
        }
    }
}

impl FromStr for RentalType {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(RentalType::Simple),
            "double" => Ok(RentalType::Double),
            other => Err(ParseTagError::new("rental type", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentMethod {
    Cash,
    Transfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Transfer => "transfer",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "transfer" => Ok(PaymentMethod::Transfer),
            other => Err(ParseTagError::new("payment method", other)),
        }
    }
}

/// Lifecycle of a rental. `Completed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RentalStatus {
    Active,
    Completed,
    Cancelled,
}

impl RentalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RentalStatus::Active => "active",
            RentalStatus::Completed => "completed",
            RentalStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RentalStatus::Active)
    }

    pub fn can_transition_to(&self, next: RentalStatus) -> bool {
        matches!(
            (self, next),
            (RentalStatus::Active, RentalStatus::Completed)
                | (RentalStatus::Active, RentalStatus::Cancelled)
        )
    }
}

impl FromStr for RentalStatus {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(RentalStatus::Active),
            "completed" => Ok(RentalStatus::Completed),
            "cancelled" => Ok(RentalStatus::Cancelled),
            other => Err(ParseTagError::new("rental status", other)),
        }
    }
}

impl fmt::Display for RentalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contact details optionally collected when a rental is closed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactInfo {
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl ContactInfo {
    pub fn is_empty(&self) -> bool {
        self.phone.is_none() && self.email.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot move rental from {from} to {to}")]
pub struct TransitionError {
    pub from: RentalStatus,
    pub to: RentalStatus,
}

/// A timed equipment checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rental {
    pub id: Uuid,
    pub kayak_id: i32,
    pub start_time: DateTime<Utc>,
    /// Nominal return time. Nothing enforces it.
    pub end_time: DateTime<Utc>,
    pub rental_type: RentalType,
    pub payment_method: PaymentMethod,
    pub amount: u64,
    pub status: RentalStatus,
    pub contact_info: Option<ContactInfo>,
}

impl Rental {
    /// Applies a status change, attaching contact info when one is supplied.
    /// Contact info already on the rental is kept if `contact` is `None`.
    pub fn transition(
        &mut self,
        next: RentalStatus,
        contact: Option<ContactInfo>,
    ) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        if let Some(contact) = contact.filter(|c| !c.is_empty()) {
            self.contact_info = Some(contact);
        }
        Ok(())
    }

    /// Time left until the nominal end, clamped at zero.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        let left = self.end_time - now;
        if left < Duration::zero() {
            Duration::zero()
        } else {
            left
        }
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == RentalStatus::Active && now >= self.end_time
    }
}

/// The fields needed to register a new rental. The store assigns the id.
#[derive(Debug, Clone)]
pub struct NewRental {
    pub kayak_id: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub rental_type: RentalType,
    pub payment_method: PaymentMethod,
    pub amount: u64,
}

/// Prices and nominal duration applied to newly registered rentals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tariff {
    pub simple_price: u64,
    pub double_price: u64,
    pub duration: Duration,
}

impl Default for Tariff {
    fn default() -> Self {
        Self {
            simple_price: 6000,
            double_price: 8000,
            duration: Duration::minutes(30),
        }
    }
}

impl Tariff {
    pub fn price_for(&self, rental_type: RentalType) -> u64 {
        match rental_type {
            RentalType::Simple => self.simple_price,
            RentalType::Double => self.double_price,
        }
    }

    /// Builds a rental starting at `now`. `amount` overrides the listed price.
    pub fn quote(
        &self,
        kayak_id: i32,
        rental_type: RentalType,
        payment_method: PaymentMethod,
        amount: Option<u64>,
        now: DateTime<Utc>,
    ) -> NewRental {
        NewRental {
            kayak_id,
            start_time: now,
            end_time: now + self.duration,
            rental_type,
            payment_method,
            amount: amount.unwrap_or_else(|| self.price_for(rental_type)),
        }
    }
}

//=========================================================================================
// Users and Access
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Employee,
}

/// Actions gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    RegisterRentals,
    ViewRentals,
    ViewReports,
    ManageUsers,
    ManageFleet,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Employee => "employee",
        }
    }

    pub fn allows(&self, capability: Capability) -> bool {
        match self {
            Role::Admin => true,
            Role::Employee => matches!(
                capability,
                Capability::RegisterRentals | Capability::ViewRentals
            ),
        }
    }
}

impl FromStr for Role {
    type Err = ParseTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "employee" => Ok(Role::Employee),
            other => Err(ParseTagError::new("role", other)),
        }
    }
}

// Represents a user - used throughout app
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub hashed_password: String,
}

/// Fields for a user about to be inserted. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub hashed_password: String,
}

/// A profile update. `hashed_password` is only replaced when present.
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub hashed_password: Option<String>,
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// A pending password reset. Consumed on use.
#[derive(Debug, Clone)]
pub struct PasswordReset {
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}
