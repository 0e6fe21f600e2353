//! Outgoing email.
//!
//! Handlers render messages at request time and queue them in the outbox together with the write
//! that caused them. The [`OutboxDispatcher`] hands queued messages to an [`EmailSender`].

mod noop;
mod outbox;
mod smtp;
mod templates;

pub use noop::NoopEmailSender;
pub use outbox::{OutboxDispatcher, MAX_ATTEMPTS};
pub use smtp::SmtpEmailSender;
pub use templates::{OrderSummary, TemplateRenderer};

use async_trait::async_trait;
use thiserror::Error;

/// A rendered email, ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Failed to render email template: {0}")]
    Template(String),
    #[error("Failed to send email: {0}")]
    Send(String),
}

/// Transport for rendered emails.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), MailError>;
}

impl From<MailError> for crate::errors::AppError {
    fn from(err: MailError) -> Self {
        crate::errors::AppError::Internal(err.to_string())
    }
}
