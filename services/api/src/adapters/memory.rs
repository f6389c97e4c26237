//! services/api/src/adapters/memory.rs
//!
//! An in-memory implementation of the `DatabaseService` port. Used when no
//! `DATABASE_URL` is configured (demo mode, nothing survives a restart) and by
//! the handler tests. All tables sit behind one lock so multi-row checks such
//! as the last-administrator guard are atomic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kayak_rental_core::domain::{
    AuthSession, ContactInfo, Kayak, NewRental, NewUser, PasswordReset, Rental, RentalStatus,
    Role, User, UserCredentials, UserUpdate,
};
use kayak_rental_core::ports::{DatabaseService, PortError, PortResult};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

struct StoredUser {
    user: User,
    hashed_password: String,
}

#[derive(Default)]
struct Tables {
    users: Vec<StoredUser>,
    sessions: HashMap<String, AuthSession>,
    resets: HashMap<String, PasswordReset>,
    kayaks: Vec<Kayak>,
    rentals: Vec<Rental>,
}

impl Tables {
    fn admin_count(&self) -> usize {
        self.users.iter().filter(|u| u.user.role == Role::Admin).count()
    }

    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .iter()
            .any(|u| u.user.email == email && Some(u.user.user_id) != except)
    }

    fn user_mut(&mut self, user_id: Uuid) -> PortResult<&mut StoredUser> {
        self.users
            .iter_mut()
            .find(|u| u.user.user_id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }
}

#[derive(Default)]
pub struct MemoryAdapter {
    tables: RwLock<Tables>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DatabaseService for MemoryAdapter {
    async fn count_users(&self) -> PortResult<u64> {
        Ok(self.tables.read().await.users.len() as u64)
    }

    async fn create_user(&self, user: NewUser) -> PortResult<User> {
        let mut tables = self.tables.write().await;
        if tables.email_taken(&user.email, None) {
            return Err(PortError::Conflict(format!(
                "Email {} is already registered",
                user.email
            )));
        }
        let stored = User {
            user_id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            role: user.role,
            created_at: Utc::now(),
        };
        tables.users.push(StoredUser {
            user: stored.clone(),
            hashed_password: user.hashed_password,
        });
        Ok(stored)
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        self.tables
            .read()
            .await
            .users
            .iter()
            .find(|u| u.user.user_id == user_id)
            .map(|u| u.user.clone())
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        self.tables
            .read()
            .await
            .users
            .iter()
            .find(|u| u.user.email == email)
            .map(|u| UserCredentials {
                user: u.user.clone(),
                hashed_password: u.hashed_password.clone(),
            })
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn list_users(&self) -> PortResult<Vec<User>> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .iter()
            .map(|u| u.user.clone())
            .collect())
    }

    async fn update_user(&self, user_id: Uuid, update: UserUpdate) -> PortResult<User> {
        let mut tables = self.tables.write().await;
        let admins = tables.admin_count();
        if tables.email_taken(&update.email, Some(user_id)) {
            return Err(PortError::Conflict(format!(
                "Email {} is already registered",
                update.email
            )));
        }

        let stored = tables.user_mut(user_id)?;
        if stored.user.role == Role::Admin && update.role != Role::Admin && admins <= 1 {
            return Err(PortError::Conflict(
                "Cannot demote the last administrator".to_string(),
            ));
        }
        stored.user.name = update.name;
        stored.user.email = update.email;
        stored.user.role = update.role;
        if let Some(hashed) = update.hashed_password {
            stored.hashed_password = hashed;
        }
        Ok(stored.user.clone())
    }

    async fn delete_user(&self, user_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        let admins = tables.admin_count();
        let position = tables
            .users
            .iter()
            .position(|u| u.user.user_id == user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))?;
        if tables.users[position].user.role == Role::Admin && admins <= 1 {
            return Err(PortError::Conflict(
                "Cannot delete the last administrator".to_string(),
            ));
        }
        tables.users.remove(position);
        tables.sessions.retain(|_, s| s.user_id != user_id);
        tables.resets.retain(|_, r| r.user_id != user_id);
        Ok(())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.tables.write().await.sessions.insert(
            session_id.to_string(),
            AuthSession {
                id: session_id.to_string(),
                user_id,
                expires_at,
            },
        );
        Ok(())
    }

    async fn validate_auth_session(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> PortResult<Uuid> {
        self.tables
            .read()
            .await
            .sessions
            .get(session_id)
            .filter(|s| s.expires_at > now)
            .map(|s| s.user_id)
            .ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.tables.write().await.sessions.remove(session_id);
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> PortResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.sessions.len() + tables.resets.len();
        tables.sessions.retain(|_, s| s.expires_at > now);
        tables.resets.retain(|_, r| r.expires_at > now);
        let after = tables.sessions.len() + tables.resets.len();
        Ok((before - after) as u64)
    }

    async fn create_password_reset(&self, reset: PasswordReset) -> PortResult<()> {
        self.tables
            .write()
            .await
            .resets
            .insert(reset.token.clone(), reset);
        Ok(())
    }

    async fn get_password_reset(&self, token: &str) -> PortResult<PasswordReset> {
        self.tables
            .read()
            .await
            .resets
            .get(token)
            .cloned()
            .ok_or_else(|| PortError::NotFound("Reset token not found".to_string()))
    }

    async fn complete_password_reset(
        &self,
        token: &str,
        hashed_password: &str,
        now: DateTime<Utc>,
    ) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        let reset = tables
            .resets
            .get(token)
            .filter(|r| r.expires_at > now)
            .cloned()
            .ok_or(PortError::Unauthorized)?;

        tables.user_mut(reset.user_id)?.hashed_password = hashed_password.to_string();
        tables.resets.retain(|_, r| r.user_id != reset.user_id);
        tables.sessions.retain(|_, s| s.user_id != reset.user_id);
        Ok(())
    }

    async fn list_kayaks(&self) -> PortResult<Vec<Kayak>> {
        Ok(self.tables.read().await.kayaks.clone())
    }

    async fn get_kayak(&self, kayak_id: i32) -> PortResult<Kayak> {
        self.tables
            .read()
            .await
            .kayaks
            .iter()
            .find(|k| k.id == kayak_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Kayak {} not found", kayak_id)))
    }

    async fn create_kayak(&self, name: &str, is_stand_up_paddle: bool) -> PortResult<Kayak> {
        let mut tables = self.tables.write().await;
        let id = tables.kayaks.iter().map(|k| k.id).max().unwrap_or(0) + 1;
        let kayak = Kayak {
            id,
            name: name.to_string(),
            is_stand_up_paddle,
        };
        tables.kayaks.push(kayak.clone());
        Ok(kayak)
    }

    async fn seed_kayaks(&self, roster: &[Kayak]) -> PortResult<usize> {
        let mut tables = self.tables.write().await;
        if !tables.kayaks.is_empty() {
            return Ok(0);
        }
        tables.kayaks.extend_from_slice(roster);
        Ok(roster.len())
    }

    async fn list_rentals(&self) -> PortResult<Vec<Rental>> {
        Ok(self.tables.read().await.rentals.clone())
    }

    async fn get_rental(&self, rental_id: Uuid) -> PortResult<Rental> {
        self.tables
            .read()
            .await
            .rentals
            .iter()
            .find(|r| r.id == rental_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Rental {} not found", rental_id)))
    }

    async fn create_rental(&self, rental: NewRental) -> PortResult<Rental> {
        let stored = Rental {
            id: Uuid::new_v4(),
            kayak_id: rental.kayak_id,
            start_time: rental.start_time,
            end_time: rental.end_time,
            rental_type: rental.rental_type,
            payment_method: rental.payment_method,
            amount: rental.amount,
            status: RentalStatus::Active,
            contact_info: None,
        };
        self.tables.write().await.rentals.push(stored.clone());
        Ok(stored)
    }

    async fn update_rental_status(
        &self,
        rental_id: Uuid,
        status: RentalStatus,
        contact_info: Option<ContactInfo>,
    ) -> PortResult<Rental> {
        let mut tables = self.tables.write().await;
        let rental = tables
            .rentals
            .iter_mut()
            .find(|r| r.id == rental_id)
            .ok_or_else(|| PortError::NotFound(format!("Rental {} not found", rental_id)))?;
        rental.transition(status, contact_info)?;
        Ok(rental.clone())
    }
}
