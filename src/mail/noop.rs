//! Sender used when no SMTP relay is configured.

use async_trait::async_trait;

use super::{EmailMessage, EmailSender, MailError};

/// Logs and drops every message.
pub struct NoopEmailSender;

#[async_trait]
impl EmailSender for NoopEmailSender {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), MailError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            "SMTP not configured, email dropped"
        );
        Ok(())
    }
}
