//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! Invariants that span rows (the last administrator, rental status changes,
//! single-use reset tokens) are checked inside a transaction holding row locks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kayak_rental_core::domain::{
    ContactInfo, Kayak, NewRental, NewUser, PasswordReset, Rental, RentalStatus, Role, User,
    UserCredentials, UserUpdate,
};
use kayak_rental_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use tracing::warn;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found_or_unexpected(e: sqlx::Error, what: String) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what),
        _ => PortError::Unexpected(e.to_string()),
    }
}

fn email_conflict_or_unexpected(e: sqlx::Error, email: &str) -> PortError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            PortError::Conflict(format!("Email {} is already registered", email))
        }
        _ => PortError::Unexpected(e.to_string()),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const USER_COLUMNS: &str = "user_id, name, email, role, created_at";
const RENTAL_COLUMNS: &str = "id, kayak_id, start_time, end_time, rental_type, payment_method, \
     amount, status, contact_phone, contact_email";

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    name: String,
    email: String,
    role: String,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> PortResult<User> {
        let role = self
            .role
            .parse::<Role>()
            .map_err(|e| PortError::Unexpected(format!("user {}: {}", self.user_id, e)))?;
        Ok(User {
            user_id: self.user_id,
            name: self.name,
            email: self.email,
            role,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    #[sqlx(flatten)]
    user: UserRecord,
    hashed_password: String,
}

#[derive(FromRow)]
struct KayakRecord {
    id: i32,
    name: String,
    is_stand_up_paddle: bool,
}
impl KayakRecord {
    fn to_domain(self) -> Kayak {
        Kayak {
            id: self.id,
            name: self.name,
            is_stand_up_paddle: self.is_stand_up_paddle,
        }
    }
}

#[derive(FromRow)]
struct RentalRecord {
    id: Uuid,
    kayak_id: i32,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    rental_type: String,
    payment_method: String,
    amount: i64,
    status: String,
    contact_phone: Option<String>,
    contact_email: Option<String>,
}
impl RentalRecord {
    /// Fails with a description when a column holds a value the domain cannot represent.
    fn to_domain(self) -> Result<Rental, String> {
        let amount = u64::try_from(self.amount)
            .ok()
            .filter(|amount| *amount > 0)
            .ok_or_else(|| format!("amount {} is not positive", self.amount))?;
        let contact_info = ContactInfo {
            phone: self.contact_phone,
            email: self.contact_email,
        };
        Ok(Rental {
            id: self.id,
            kayak_id: self.kayak_id,
            start_time: self.start_time,
            end_time: self.end_time,
            rental_type: self.rental_type.parse().map_err(|e| format!("{}", e))?,
            payment_method: self.payment_method.parse().map_err(|e| format!("{}", e))?,
            amount,
            status: self.status.parse().map_err(|e| format!("{}", e))?,
            contact_info: (!contact_info.is_empty()).then_some(contact_info),
        })
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn count_users(&self) -> PortResult<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(count as u64)
    }

    async fn create_user(&self, user: NewUser) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "INSERT INTO users (user_id, name, email, role, hashed_password) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(&user.hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| email_conflict_or_unexpected(e, &user.email))?;
        record.to_domain()
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE user_id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("User {} not found", user_id)))?;
        record.to_domain()
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(&format!(
            "SELECT {}, hashed_password FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("User {} not found", email)))?;
        Ok(UserCredentials {
            user: record.user.to_domain()?,
            hashed_password: record.hashed_password,
        })
    }

    async fn list_users(&self) -> PortResult<Vec<User>> {
        let records = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users ORDER BY created_at ASC",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn update_user(&self, user_id: Uuid, update: UserUpdate) -> PortResult<User> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let admins: Vec<(Uuid,)> =
            sqlx::query_as("SELECT user_id FROM users WHERE role = 'admin' FOR UPDATE")
                .fetch_all(&mut *tx)
                .await
                .map_err(unexpected)?;
        let is_admin = admins.iter().any(|(id,)| *id == user_id);
        if is_admin && update.role != Role::Admin && admins.len() <= 1 {
            return Err(PortError::Conflict(
                "Cannot demote the last administrator".to_string(),
            ));
        }

        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "UPDATE users SET name = $2, email = $3, role = $4, \
             hashed_password = COALESCE($5, hashed_password), updated_at = NOW() \
             WHERE user_id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(user_id)
        .bind(&update.name)
        .bind(&update.email)
        .bind(update.role.as_str())
        .bind(update.hashed_password.as_deref())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", user_id)),
            other => email_conflict_or_unexpected(other, &update.email),
        })?;

        tx.commit().await.map_err(unexpected)?;
        record.to_domain()
    }

    async fn delete_user(&self, user_id: Uuid) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let admins: Vec<(Uuid,)> =
            sqlx::query_as("SELECT user_id FROM users WHERE role = 'admin' FOR UPDATE")
                .fetch_all(&mut *tx)
                .await
                .map_err(unexpected)?;
        if admins.iter().any(|(id,)| *id == user_id) && admins.len() <= 1 {
            return Err(PortError::Conflict(
                "Cannot delete the last administrator".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("User {} not found", user_id)));
        }

        tx.commit().await.map_err(unexpected)?;
        Ok(())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> PortResult<Uuid> {
        let (user_id,): (Uuid,) = sqlx::query_as(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > $2",
        )
        .bind(session_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::Unauthorized,
            _ => PortError::Unexpected(e.to_string()),
        })?;
        Ok(user_id)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> PortResult<u64> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;
        let sessions = sqlx::query("DELETE FROM auth_sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        let resets = sqlx::query("DELETE FROM password_resets WHERE expires_at <= $1")
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        tx.commit().await.map_err(unexpected)?;
        Ok(sessions.rows_affected() + resets.rows_affected())
    }

    async fn create_password_reset(&self, reset: PasswordReset) -> PortResult<()> {
        sqlx::query("INSERT INTO password_resets (token, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(&reset.token)
            .bind(reset.user_id)
            .bind(reset.expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn get_password_reset(&self, token: &str) -> PortResult<PasswordReset> {
        let (user_id, expires_at): (Uuid, DateTime<Utc>) =
            sqlx::query_as("SELECT user_id, expires_at FROM password_resets WHERE token = $1")
                .bind(token)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| not_found_or_unexpected(e, "Reset token not found".to_string()))?;
        Ok(PasswordReset {
            token: token.to_string(),
            user_id,
            expires_at,
        })
    }

    async fn complete_password_reset(
        &self,
        token: &str,
        hashed_password: &str,
        now: DateTime<Utc>,
    ) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let (user_id,): (Uuid,) = sqlx::query_as(
            "SELECT user_id FROM password_resets \
             WHERE token = $1 AND expires_at > $2 FOR UPDATE",
        )
        .bind(token)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::Unauthorized,
            _ => PortError::Unexpected(e.to_string()),
        })?;

        sqlx::query("UPDATE users SET hashed_password = $2, updated_at = NOW() WHERE user_id = $1")
            .bind(user_id)
            .bind(hashed_password)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        sqlx::query("DELETE FROM password_resets WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        sqlx::query("DELETE FROM auth_sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(())
    }

    async fn list_kayaks(&self) -> PortResult<Vec<Kayak>> {
        let records = sqlx::query_as::<_, KayakRecord>(
            "SELECT id, name, is_stand_up_paddle FROM kayaks ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_kayak(&self, kayak_id: i32) -> PortResult<Kayak> {
        let record = sqlx::query_as::<_, KayakRecord>(
            "SELECT id, name, is_stand_up_paddle FROM kayaks WHERE id = $1",
        )
        .bind(kayak_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("Kayak {} not found", kayak_id)))?;
        Ok(record.to_domain())
    }

    async fn create_kayak(&self, name: &str, is_stand_up_paddle: bool) -> PortResult<Kayak> {
        let record = sqlx::query_as::<_, KayakRecord>(
            "INSERT INTO kayaks (name, is_stand_up_paddle) VALUES ($1, $2) \
             RETURNING id, name, is_stand_up_paddle",
        )
        .bind(name)
        .bind(is_stand_up_paddle)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn seed_kayaks(&self, roster: &[Kayak]) -> PortResult<usize> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM kayaks")
            .fetch_one(&mut *tx)
            .await
            .map_err(unexpected)?;
        if count > 0 {
            return Ok(0);
        }

        for kayak in roster {
            sqlx::query("INSERT INTO kayaks (id, name, is_stand_up_paddle) VALUES ($1, $2, $3)")
                .bind(kayak.id)
                .bind(&kayak.name)
                .bind(kayak.is_stand_up_paddle)
                .execute(&mut *tx)
                .await
                .map_err(unexpected)?;
        }
        // Explicit ids bypass the sequence; move it past them.
        sqlx::query(
            "SELECT setval(pg_get_serial_sequence('kayaks', 'id'), \
             COALESCE((SELECT MAX(id) FROM kayaks), 1))",
        )
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(roster.len())
    }

    async fn list_rentals(&self) -> PortResult<Vec<Rental>> {
        let records = sqlx::query_as::<_, RentalRecord>(&format!(
            "SELECT {} FROM rentals ORDER BY start_time ASC",
            RENTAL_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let rentals = records
            .into_iter()
            .filter_map(|record| {
                let id = record.id;
                match record.to_domain() {
                    Ok(rental) => Some(rental),
                    Err(reason) => {
                        warn!("Skipping malformed rental {}: {}", id, reason);
                        None
                    }
                }
            })
            .collect();
        Ok(rentals)
    }

    async fn get_rental(&self, rental_id: Uuid) -> PortResult<Rental> {
        let record = sqlx::query_as::<_, RentalRecord>(&format!(
            "SELECT {} FROM rentals WHERE id = $1",
            RENTAL_COLUMNS
        ))
        .bind(rental_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("Rental {} not found", rental_id)))?;
        record
            .to_domain()
            .map_err(|reason| PortError::Unexpected(format!("rental {}: {}", rental_id, reason)))
    }

    async fn create_rental(&self, rental: NewRental) -> PortResult<Rental> {
        let amount = i64::try_from(rental.amount)
            .ok()
            .filter(|amount| *amount > 0)
            .ok_or_else(|| PortError::Unexpected(format!("amount {} out of range", rental.amount)))?;
        let record = sqlx::query_as::<_, RentalRecord>(&format!(
            "INSERT INTO rentals (id, kayak_id, start_time, end_time, rental_type, \
             payment_method, amount, status) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {}",
            RENTAL_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(rental.kayak_id)
        .bind(rental.start_time)
        .bind(rental.end_time)
        .bind(rental.rental_type.as_str())
        .bind(rental.payment_method.as_str())
        .bind(amount)
        .bind(RentalStatus::Active.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain().map_err(PortError::Unexpected)
    }

    async fn update_rental_status(
        &self,
        rental_id: Uuid,
        status: RentalStatus,
        contact_info: Option<ContactInfo>,
    ) -> PortResult<Rental> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let record = sqlx::query_as::<_, RentalRecord>(&format!(
            "SELECT {} FROM rentals WHERE id = $1 FOR UPDATE",
            RENTAL_COLUMNS
        ))
        .bind(rental_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("Rental {} not found", rental_id)))?;
        let mut rental = record
            .to_domain()
            .map_err(|reason| PortError::Unexpected(format!("rental {}: {}", rental_id, reason)))?;

        rental.transition(status, contact_info)?;

        let contact = rental.contact_info.clone().unwrap_or_default();
        sqlx::query(
            "UPDATE rentals SET status = $2, contact_phone = $3, contact_email = $4, \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(rental_id)
        .bind(rental.status.as_str())
        .bind(contact.phone)
        .bind(contact.email)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(rental)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use kayak_rental_core::domain::{PaymentMethod, RentalType};

    fn record() -> RentalRecord {
        let start_time = Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap();
        RentalRecord {
            id: Uuid::new_v4(),
            kayak_id: 4,
            start_time,
            end_time: start_time + Duration::hours(1),
            rental_type: "double".to_string(),
            payment_method: "transfer".to_string(),
            amount: 20_000,
            status: "active".to_string(),
            contact_phone: None,
            contact_email: None,
        }
    }

    #[test]
    fn test_rental_record_decodes() {
        let rental = record().to_domain().unwrap();
        assert_eq!(rental.kayak_id, 4);
        assert_eq!(rental.rental_type, RentalType::Double);
        assert_eq!(rental.payment_method, PaymentMethod::Transfer);
        assert_eq!(rental.status, RentalStatus::Active);
        assert_eq!(rental.amount, 20_000);
        assert!(rental.contact_info.is_none());

        let with_phone = RentalRecord {
            contact_phone: Some("555-0101".to_string()),
            ..record()
        };
        let contact = with_phone.to_domain().unwrap().contact_info.unwrap();
        assert_eq!(contact.phone.as_deref(), Some("555-0101"));
    }

    #[test]
    fn test_malformed_rental_records_are_refused() {
        let bad_tag = RentalRecord {
            rental_type: "triple".to_string(),
            ..record()
        };
        assert!(bad_tag.to_domain().is_err());

        let bad_status = RentalRecord {
            status: "lost".to_string(),
            ..record()
        };
        assert!(bad_status.to_domain().is_err());

        for amount in [0, -5] {
            let err = RentalRecord { amount, ..record() }.to_domain().unwrap_err();
            assert!(err.contains("not positive"), "{}", err);
        }
    }
}
