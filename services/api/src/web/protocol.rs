//! services/api/src/web/protocol.rs
//!
//! JSON wire types shared by the REST handlers, and their conversions to and
//! from the core domain. Tags travel as lowercase strings.

use chrono::{DateTime, Utc};
use kayak_rental_core::domain::{
    ContactInfo, PaymentMethod, Rental, RentalStatus, RentalType, Role, User,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Tags
//=========================================================================================

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoleTag {
    Admin,
    Employee,
}

impl From<RoleTag> for Role {
    fn from(tag: RoleTag) -> Self {
        match tag {
            RoleTag::Admin => Role::Admin,
            RoleTag::Employee => Role::Employee,
        }
    }
}

impl From<Role> for RoleTag {
    fn from(role: Role) -> Self {
        match role {
            Role::Admin => RoleTag::Admin,
            Role::Employee => RoleTag::Employee,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RentalTypeTag {
    Simple,
    Double,
}

impl From<RentalTypeTag> for RentalType {
    fn from(tag: RentalTypeTag) -> Self {
        match tag {
            RentalTypeTag::Simple => RentalType::Simple,
            RentalTypeTag::Double => RentalType::Double,
        }
    }
}

impl From<RentalType> for RentalTypeTag {
    fn from(t: RentalType) -> Self {
        match t {
            RentalType::Simple => RentalTypeTag::Simple,
            RentalType::Double => RentalTypeTag::Double,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodTag {
    Cash,
    Transfer,
}

impl From<PaymentMethodTag> for PaymentMethod {
    fn from(tag: PaymentMethodTag) -> Self {
        match tag {
            PaymentMethodTag::Cash => PaymentMethod::Cash,
            PaymentMethodTag::Transfer => PaymentMethod::Transfer,
        }
    }
}

impl From<PaymentMethod> for PaymentMethodTag {
    fn from(m: PaymentMethod) -> Self {
        match m {
            PaymentMethod::Cash => PaymentMethodTag::Cash,
            PaymentMethod::Transfer => PaymentMethodTag::Transfer,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RentalStatusTag {
    Active,
    Completed,
    Cancelled,
}

impl From<RentalStatusTag> for RentalStatus {
    fn from(tag: RentalStatusTag) -> Self {
        match tag {
            RentalStatusTag::Active => RentalStatus::Active,
            RentalStatusTag::Completed => RentalStatus::Completed,
            RentalStatusTag::Cancelled => RentalStatus::Cancelled,
        }
    }
}

impl From<RentalStatus> for RentalStatusTag {
    fn from(s: RentalStatus) -> Self {
        match s {
            RentalStatus::Active => RentalStatusTag::Active,
            RentalStatus::Completed => RentalStatusTag::Completed,
            RentalStatus::Cancelled => RentalStatusTag::Cancelled,
        }
    }
}

//=========================================================================================
// Records
//=========================================================================================

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactInfoBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl From<ContactInfoBody> for ContactInfo {
    fn from(body: ContactInfoBody) -> Self {
        // Blank form fields arrive as empty strings.
        let keep = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        ContactInfo {
            phone: keep(body.phone),
            email: keep(body.email),
        }
    }
}

impl From<ContactInfo> for ContactInfoBody {
    fn from(info: ContactInfo) -> Self {
        ContactInfoBody {
            phone: info.phone,
            email: info.email,
        }
    }
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct UserResponse {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: RoleTag,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            name: user.name,
            email: user.email,
            role: user.role.into(),
            created_at: user.created_at,
        }
    }
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct RentalResponse {
    pub id: Uuid,
    pub kayak_id: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(rename = "type")]
    pub rental_type: RentalTypeTag,
    pub payment_method: PaymentMethodTag,
    pub amount: u64,
    pub status: RentalStatusTag,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<ContactInfoBody>,
}

impl From<Rental> for RentalResponse {
    fn from(rental: Rental) -> Self {
        Self {
            id: rental.id,
            kayak_id: rental.kayak_id,
            start_time: rental.start_time,
            end_time: rental.end_time,
            rental_type: rental.rental_type.into(),
            payment_method: rental.payment_method.into(),
            amount: rental.amount,
            status: rental.status.into(),
            contact_info: rental.contact_info.map(Into::into),
        }
    }
}
