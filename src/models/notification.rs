//! Notification model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::timestamp;

/// Read state of a notification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Unread,
    Read,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Unread => "unread",
            NotificationStatus::Read => "read",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unread" => Some(NotificationStatus::Unread),
            "read" => Some(NotificationStatus::Read),
            _ => None,
        }
    }
}

/// Durable record of a domain event, addressed to a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub title: String,
    pub message: String,
    pub status: NotificationStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl Notification {
    pub fn new(user_id: Option<&str>, title: &str, message: String, now: DateTime<Utc>) -> Self {
        let now = timestamp(now);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.map(str::to_string),
            title: title.to_string(),
            message,
            status: NotificationStatus::Unread,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}
