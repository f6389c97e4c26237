//! services/api/src/adapters/mailer.rs
//!
//! Outbound mail. Delivery through a real mail server is outside this
//! service; the log mailer records the message so an operator can pass the
//! link on.

use async_trait::async_trait;
use kayak_rental_core::ports::{MailService, PortResult};
use tracing::info;

#[derive(Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl MailService for LogMailer {
    async fn send_password_reset(&self, email: &str, reset_link: &str) -> PortResult<()> {
        info!(to = %email, link = %reset_link, "Password reset requested");
        Ok(())
    }
}
