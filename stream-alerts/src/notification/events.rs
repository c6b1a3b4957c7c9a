//! Notification events published to observers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stream_platforms::Platform;
use tokio::sync::broadcast;

use crate::domain::ChannelId;

/// What happened to a stream's notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Live notifications were delivered.
    Send,
    /// Live notifications were withdrawn after the stream went offline.
    Retract,
}

/// A delivered or retracted batch of notifications for one stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub kind: NotificationKind,
    pub platform: Platform,
    /// Stream name as stored.
    pub stream: String,
    /// Message text for sends; `None` for retractions.
    pub content: Option<String>,
    /// Channels actually delivered to (send) or cleaned up in (retract).
    pub destinations: Vec<ChannelId>,
    pub timestamp: DateTime<Utc>,
}

impl NotificationEvent {
    pub fn send(
        platform: Platform,
        stream: impl Into<String>,
        content: impl Into<String>,
        destinations: Vec<ChannelId>,
    ) -> Self {
        Self {
            kind: NotificationKind::Send,
            platform,
            stream: stream.into(),
            content: Some(content.into()),
            destinations,
            timestamp: Utc::now(),
        }
    }

    pub fn retract(platform: Platform, stream: impl Into<String>, destinations: Vec<ChannelId>) -> Self {
        Self {
            kind: NotificationKind::Retract,
            platform,
            stream: stream.into(),
            content: None,
            destinations,
            timestamp: Utc::now(),
        }
    }
}

/// Fan-out of notification events to any number of observers.
#[derive(Clone)]
pub struct NotificationEventBroadcaster {
    sender: broadcast::Sender<NotificationEvent>,
}

impl NotificationEventBroadcaster {
    /// Create a broadcaster with the default capacity (256).
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. Returns the number of observers that received it;
    /// zero when nobody is listening.
    pub fn publish(&self, event: NotificationEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for NotificationEventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
