//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use chrono::{DateTime, FixedOffset, Utc};
use kayak_rental_core::ports::{DatabaseService, MailService};
use std::sync::Arc;

/// Source of the current instant. Swapped out in tests.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub mailer: Arc<dyn MailService>,
    pub config: Arc<Config>,
    pub clock: Clock,
}

impl AppState {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        mailer: Arc<dyn MailService>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            db,
            mailer,
            config,
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// The current instant in the zone reports are computed in.
    pub fn local_now(&self) -> DateTime<FixedOffset> {
        self.now().with_timezone(&self.config.report_offset)
    }
}
