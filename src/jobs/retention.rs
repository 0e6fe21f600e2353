//! Nightly purge of old read notifications.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use tokio::sync::watch;

use super::Clock;
use crate::db::Repository;
use crate::errors::AppError;

/// Read notifications older than this are deleted.
pub const RETENTION_DAYS: i64 = 30;

pub struct RetentionJob {
    repo: Repository,
    clock: Arc<dyn Clock>,
    retention: Duration,
}

impl RetentionJob {
    pub fn new(repo: Repository, clock: Arc<dyn Clock>) -> Self {
        Self {
            repo,
            clock,
            retention: Duration::days(RETENTION_DAYS),
        }
    }

    /// Delete read notifications created before the retention window. Unread ones are kept
    /// regardless of age.
    pub async fn run_once(&self) -> Result<u64, AppError> {
        let cutoff = self.clock.now() - self.retention;
        let removed = self.repo.delete_read_notifications_before(cutoff).await?;
        tracing::info!(removed, cutoff = %cutoff, "Notification retention run finished");
        Ok(removed)
    }

    /// Run at every 00:00 UTC until shutdown is signalled.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        loop {
            let now = self.clock.now();
            let wait = (next_run_after(now) - now)
                .to_std()
                .unwrap_or(std::time::Duration::ZERO);
            tracing::debug!(seconds = wait.as_secs(), "Next notification retention run scheduled");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    if let Err(e) = self.run_once().await {
                        tracing::error!("Notification retention run failed: {}", e);
                    }
                }
                _ = shutdown.changed() => {
                    tracing::info!("Notification retention job stopping");
                    break;
                }
            }
        }
    }
}

/// The first midnight (UTC) strictly after `now`.
pub fn next_run_after(now: DateTime<Utc>) -> DateTime<Utc> {
    let tomorrow = now.date_naive() + Duration::days(1);
    tomorrow.and_time(NaiveTime::MIN).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use crate::jobs::FixedClock;
    use crate::models::{Notification, NotificationStatus};
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_next_run_is_following_midnight() {
        let evening = Utc.with_ymd_and_hms(2026, 3, 1, 18, 30, 0).unwrap();
        assert_eq!(
            next_run_after(evening),
            Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap()
        );

        let midnight = Utc.with_ymd_and_hms(2026, 12, 31, 0, 0, 0).unwrap();
        assert_eq!(
            next_run_after(midnight),
            Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_run_once_keeps_recent_and_unread() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::new(
            init_database(&dir.path().join("retention.sqlite"))
                .await
                .unwrap(),
        );
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();

        let read = |days: i64| {
            let mut n = Notification::new(None, "t", "m".to_string(), now - Duration::days(days));
            n.status = NotificationStatus::Read;
            n
        };
        let old_read = read(31);
        let recent_read = read(29);
        let old_unread = Notification::new(None, "t", "m".to_string(), now - Duration::days(40));

        for n in [&old_read, &recent_read, &old_unread] {
            repo.insert_notification(n).await.unwrap();
        }

        let job = RetentionJob::new(repo.clone(), Arc::new(FixedClock::new(now)));
        assert_eq!(job.run_once().await.unwrap(), 1);
        assert_eq!(job.run_once().await.unwrap(), 0);

        let ids: Vec<String> = repo
            .list_notifications()
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(ids.len(), 2);
        assert!(!ids.contains(&old_read.id));
    }
}
