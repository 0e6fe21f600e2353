//! Live notification fan-out.
//!
//! Every connected `/ws` client holds a [`Subscription`] on one broadcast channel. Delivery is
//! best-effort: a client that falls behind skips what it missed.

pub mod messages;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::models::Notification;

/// Event name clients send to announce a notification.
pub const CLIENT_EVENT: &str = "notification";
/// Event name pushed to clients.
pub const PUSH_EVENT: &str = "newNotification";

const CHANNEL_CAPACITY: usize = 256;

/// Wire frame in both directions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LiveFrame {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Clone)]
struct LiveEvent {
    /// Connection that produced the event; `None` for server-side events
    origin: Option<u64>,
    payload: Arc<str>,
}

#[derive(Clone)]
pub struct LiveHub {
    tx: broadcast::Sender<LiveEvent>,
    next_id: Arc<AtomicU64>,
}

impl Default for LiveHub {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            rx: self.tx.subscribe(),
        }
    }

    /// Push `data` as a `newNotification` frame to every subscriber except `origin`.
    pub fn publish(&self, origin: Option<u64>, data: serde_json::Value) {
        let frame = LiveFrame {
            event: PUSH_EVENT.to_string(),
            data,
        };
        let payload = match serde_json::to_string(&frame) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Live frame not serializable: {}", e);
                return;
            }
        };

        // An error only means nobody is listening.
        let delivered = self
            .tx
            .send(LiveEvent {
                origin,
                payload: payload.into(),
            })
            .unwrap_or(0);
        tracing::debug!(receivers = delivered, "Live event published");
    }

    /// Announce a persisted notification to every connected client.
    pub fn publish_notification(&self, notification: &Notification) {
        match serde_json::to_value(notification) {
            Ok(data) => self.publish(None, data),
            Err(e) => tracing::warn!("Notification not serializable: {}", e),
        }
    }

    /// Relay a frame received from connection `origin`. Frames with other events are ignored.
    pub fn relay_client_frame(&self, origin: u64, text: &str) {
        match serde_json::from_str::<LiveFrame>(text) {
            Ok(frame) if frame.event == CLIENT_EVENT => self.publish(Some(origin), frame.data),
            Ok(frame) => tracing::debug!(event = %frame.event, "Ignoring live frame"),
            Err(e) => tracing::debug!("Malformed live frame: {}", e),
        }
    }
}

pub struct Subscription {
    id: u64,
    rx: broadcast::Receiver<LiveEvent>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Next serialized frame for this connection, or `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<Arc<str>> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.origin == Some(self.id) => continue,
                Ok(event) => return Some(event.payload),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(connection = self.id, skipped, "Live subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn test_client_frame_reaches_others_but_not_sender() {
        let hub = LiveHub::new();
        let mut sender = hub.subscribe();
        let mut other = hub.subscribe();

        hub.relay_client_frame(sender.id(), r#"{"event":"notification","data":{"title":"hi"}}"#);

        let received = other.recv().await.unwrap();
        let frame: LiveFrame = serde_json::from_str(&received).unwrap();
        assert_eq!(
            frame,
            LiveFrame {
                event: "newNotification".to_string(),
                data: json!({ "title": "hi" }),
            }
        );

        let nothing = tokio::time::timeout(Duration::from_millis(50), sender.recv()).await;
        assert!(nothing.is_err());
    }

    #[tokio::test]
    async fn test_server_events_reach_everyone() {
        let hub = LiveHub::new();
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();

        hub.publish(None, json!({ "title": "New Order" }));

        assert!(a.recv().await.unwrap().contains("New Order"));
        assert!(b.recv().await.unwrap().contains("New Order"));
    }

    #[tokio::test]
    async fn test_other_client_events_are_dropped() {
        let hub = LiveHub::new();
        let mut listener = hub.subscribe();

        hub.relay_client_frame(99, r#"{"event":"typing","data":{}}"#);
        hub.relay_client_frame(99, "not json");
        hub.publish(None, json!("marker"));

        assert!(listener.recv().await.unwrap().contains("marker"));
    }

    #[test]
    fn test_publish_without_subscribers_is_harmless() {
        LiveHub::new().publish(None, json!({}));
    }
}
