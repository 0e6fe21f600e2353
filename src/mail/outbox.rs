//! Background delivery of queued emails.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use super::EmailSender;
use crate::db::Repository;
use crate::errors::AppError;

/// Attempts after which a message stays in the outbox unsent.
pub const MAX_ATTEMPTS: i64 = 5;

const BATCH_SIZE: i64 = 50;

pub struct OutboxDispatcher {
    repo: Repository,
    sender: Arc<dyn EmailSender>,
    interval: Duration,
}

impl OutboxDispatcher {
    pub fn new(repo: Repository, sender: Arc<dyn EmailSender>, interval: Duration) -> Self {
        Self {
            repo,
            sender,
            interval,
        }
    }

    /// Try every pending message once. Returns how many were delivered.
    pub async fn drain_once(&self) -> Result<usize, AppError> {
        let pending = self.repo.pending_emails(MAX_ATTEMPTS, BATCH_SIZE).await?;
        let mut delivered = 0;

        for email in pending {
            match self.sender.send_email(&email.message).await {
                Ok(()) => {
                    self.repo.mark_email_sent(&email.id).await?;
                    delivered += 1;
                }
                Err(e) => {
                    let attempts = email.attempts + 1;
                    if attempts >= MAX_ATTEMPTS {
                        tracing::error!(
                            id = %email.id,
                            to = %email.message.to,
                            attempts,
                            "Giving up on email: {}",
                            e
                        );
                    } else {
                        tracing::warn!(id = %email.id, attempts, "Email delivery failed: {}", e);
                    }
                    self.repo.mark_email_failed(&email.id, &e.to_string()).await?;
                }
            }
        }

        Ok(delivered)
    }

    /// Drain on every tick until shutdown is signalled.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.drain_once().await {
                        Ok(0) => {}
                        Ok(n) => tracing::info!(delivered = n, "Email outbox drained"),
                        Err(e) => tracing::error!("Email outbox drain failed: {}", e),
                    }
                }
                _ = shutdown.changed() => {
                    tracing::info!("Email outbox dispatcher stopping");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_database, CourseEffects};
    use crate::mail::{EmailMessage, MailError};
    use crate::models::Course;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct FlakySender {
        failures_left: AtomicUsize,
        sent: AtomicUsize,
    }

    #[async_trait]
    impl EmailSender for FlakySender {
        async fn send_email(&self, _email: &EmailMessage) -> Result<(), MailError> {
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(MailError::Send("relay down".to_string()));
            }
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failed_email_is_retried_on_next_drain() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::new(
            init_database(&dir.path().join("outbox.sqlite"))
                .await
                .unwrap(),
        );

        let course: Course = serde_json::from_value(json!({
            "id": uuid::Uuid::new_v4().to_string(),
            "name": "Rust for Web",
            "description": "Build services",
            "price": 49.0,
            "tags": "rust",
            "level": "Beginner",
            "demoUrl": "demo",
            "createdAt": "2026-01-01T00:00:00.000Z",
            "updatedAt": "2026-01-01T00:00:00.000Z",
            "version": 1
        }))
        .unwrap();
        repo.insert_course(&course).await.unwrap();
        repo.save_course(
            &course,
            CourseEffects {
                notification: None,
                email: Some(EmailMessage {
                    to: "ann@example.com".to_string(),
                    subject: "Question Reply".to_string(),
                    html_body: "<p>hi</p>".to_string(),
                    text_body: "hi".to_string(),
                }),
            },
        )
        .await
        .unwrap();

        let sender = Arc::new(FlakySender {
            failures_left: AtomicUsize::new(1),
            sent: AtomicUsize::new(0),
        });
        let dispatcher =
            OutboxDispatcher::new(repo.clone(), sender.clone(), Duration::from_secs(1));

        assert_eq!(dispatcher.drain_once().await.unwrap(), 0);
        assert_eq!(dispatcher.drain_once().await.unwrap(), 1);
        assert_eq!(dispatcher.drain_once().await.unwrap(), 0);
        assert_eq!(sender.sent.load(Ordering::SeqCst), 1);
    }
}
