//! Fixtures for handler tests: an in-memory store, a frozen clock and callers
//! of each role.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::State;
use axum::Extension;
use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use kayak_rental_core::domain::{default_roster, NewUser, Role};
use kayak_rental_core::ports::{DatabaseService, MailService, PortResult};
use tracing::Level;

use crate::adapters::MemoryAdapter;
use crate::config::Config;
use crate::web::auth::hash_password;
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;

pub const PASSWORD: &str = "paddle-hard";

pub fn frozen_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
}

pub fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: None,
        log_level: Level::INFO,
        cors_origin: "http://localhost:3000".to_string(),
        public_base_url: "http://localhost:3000".to_string(),
        report_offset: FixedOffset::east_opt(0).unwrap(),
        allow_signup: true,
        tariff: Default::default(),
        bootstrap_admin: None,
    }
}

/// Keeps reset links instead of sending them.
#[derive(Default)]
pub struct Outbox {
    links: Mutex<Vec<String>>,
}

impl Outbox {
    /// The token of the most recent reset link.
    pub fn last_token(&self) -> Option<String> {
        let links = self.links.lock().unwrap();
        let link = links.last()?;
        link.split("token=").nth(1).map(str::to_string)
    }
}

#[async_trait]
impl MailService for Outbox {
    async fn send_password_reset(&self, _email: &str, reset_link: &str) -> PortResult<()> {
        self.links.lock().unwrap().push(reset_link.to_string());
        Ok(())
    }
}

/// State over a seeded fleet, with one administrator and one employee.
pub async fn seeded_state() -> (Arc<AppState>, AuthUser, AuthUser) {
    let (state, admin, employee, _) = seeded_state_with_outbox().await;
    (state, admin, employee)
}

pub async fn seeded_state_with_outbox() -> (Arc<AppState>, AuthUser, AuthUser, Arc<Outbox>) {
    let db = Arc::new(MemoryAdapter::new());
    db.seed_kayaks(&default_roster()).await.unwrap();

    let mut callers = Vec::new();
    for (email, role) in [("admin@kayak.test", Role::Admin), ("staff@kayak.test", Role::Employee)] {
        let user = db
            .create_user(NewUser {
                name: email.split('@').next().unwrap().to_string(),
                email: email.to_string(),
                role,
                hashed_password: hash_password(PASSWORD).unwrap(),
            })
            .await
            .unwrap();
        callers.push(AuthUser {
            user_id: user.user_id,
            role,
        });
    }
    let employee = callers.pop().unwrap();
    let admin = callers.pop().unwrap();

    let outbox = Arc::new(Outbox::default());
    let state = AppState::new(db, outbox.clone(), Arc::new(test_config()))
        .with_clock(Arc::new(frozen_now));
    (Arc::new(state), admin, employee, outbox)
}

/// The same stores, seen `elapsed` after the frozen instant.
pub fn later(state: &Arc<AppState>, elapsed: Duration) -> Arc<AppState> {
    let at = frozen_now() + elapsed;
    Arc::new(state.as_ref().clone().with_clock(Arc::new(move || at)))
}

pub fn state_of(state: &Arc<AppState>) -> State<Arc<AppState>> {
    State(state.clone())
}

pub fn as_caller(caller: &AuthUser) -> Extension<AuthUser> {
    Extension(caller.clone())
}
