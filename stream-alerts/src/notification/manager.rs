//! Delivery and retraction of live notifications.
//!
//! The manager remembers which messages it posted for each stream so they
//! can be deleted when the stream goes offline. That record lives in memory
//! only; after a restart, earlier notifications are no longer retracted.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use stream_platforms::{LiveInfo, Platform};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::events::{NotificationEvent, NotificationEventBroadcaster};
use super::renderer::NotificationRenderer;
use super::transport::MessageTransport;
use crate::domain::{ChannelId, GuildId, MentionMode, MessageId, Settings, StreamKey, TrackedStream};
use crate::{Error, Result};

/// Upper bound on a single transport call unless configured otherwise.
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// A message posted for a live stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentMessage {
    pub channel: ChannelId,
    pub guild: GuildId,
    pub message: MessageId,
}

type RecordKey = (Platform, StreamKey);

#[derive(Debug, Clone)]
struct SentRecord {
    stream: String,
    messages: Vec<SentMessage>,
}

pub struct NotificationManager {
    transport: Arc<dyn MessageTransport>,
    renderer: Arc<dyn NotificationRenderer>,
    sent: Mutex<HashMap<RecordKey, SentRecord>>,
    events: NotificationEventBroadcaster,
    delivery_timeout: Duration,
}

impl NotificationManager {
    pub fn new(
        transport: Arc<dyn MessageTransport>,
        renderer: Arc<dyn NotificationRenderer>,
        events: NotificationEventBroadcaster,
    ) -> Self {
        Self {
            transport,
            renderer,
            sent: Mutex::new(HashMap::new()),
            events,
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
        }
    }

    /// Bound every channel lookup, send and delete by `timeout`.
    pub fn with_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    async fn deliver<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.delivery_timeout, call)
            .await
            .unwrap_or_else(|_| {
                Err(Error::transport(format!(
                    "delivery timed out after {:?}",
                    self.delivery_timeout
                )))
            })
    }

    pub fn events(&self) -> &NotificationEventBroadcaster {
        &self.events
    }

    /// Post the live notification to every subscribed channel that exists
    /// and accepts messages. Returns the channels delivered to.
    ///
    /// A failed delivery is logged and does not stop the others. The set
    /// of posted messages replaces any earlier record for the stream.
    pub async fn send(
        &self,
        platform: Platform,
        stream: &TrackedStream,
        live: &LiveInfo,
        settings: &Settings,
    ) -> Vec<ChannelId> {
        let key = stream.key();
        let mut delivered = Vec::new();

        for &channel in &stream.channels {
            let target = match self.deliver(self.transport.channel_info(channel)).await {
                Ok(Some(target)) if target.can_send => target,
                Ok(Some(_)) => {
                    debug!(%platform, stream = %stream.name, %channel, "No permission to post; skipping");
                    continue;
                }
                Ok(None) => {
                    debug!(%platform, stream = %stream.name, %channel, "Channel not found; skipping");
                    continue;
                }
                Err(e) => {
                    warn!(%platform, stream = %stream.name, %channel, error = %e, "Failed to look up channel");
                    continue;
                }
            };

            let mention = settings.guild(target.guild).mention;
            let message = self.renderer.render(platform, &stream.name, live, mention);

            match self.deliver(self.transport.send_message(channel, &message)).await {
                Ok(message) => delivered.push(SentMessage {
                    channel,
                    guild: target.guild,
                    message,
                }),
                Err(e) => {
                    warn!(%platform, stream = %stream.name, %channel, error = %e, "Failed to deliver notification");
                }
            }
        }

        let destinations: Vec<ChannelId> = delivered.iter().map(|m| m.channel).collect();
        self.sent.lock().await.insert(
            (platform, key),
            SentRecord {
                stream: stream.name.clone(),
                messages: delivered,
            },
        );

        info!(
            %platform,
            stream = %stream.name,
            delivered = destinations.len(),
            subscribers = stream.channels.len(),
            "Stream went live"
        );

        let content = self
            .renderer
            .render(platform, &stream.name, live, MentionMode::None)
            .content;
        self.events.publish(NotificationEvent::send(
            platform,
            stream.name.clone(),
            content,
            destinations.clone(),
        ));

        destinations
    }

    /// Delete the notifications posted for a stream, in guilds that have
    /// auto-delete enabled. Returns the channels cleaned up.
    ///
    /// Deletion failures are ignored. The record is cleared either way.
    pub async fn retract(
        &self,
        platform: Platform,
        key: &StreamKey,
        stream_name: &str,
        settings: &Settings,
    ) -> Vec<ChannelId> {
        let messages = self
            .sent
            .lock()
            .await
            .remove(&(platform, key.clone()))
            .map(|record| record.messages)
            .unwrap_or_default();

        let mut deleted = Vec::new();
        for sent in messages {
            if !settings.guild(sent.guild).auto_delete {
                continue;
            }
            match self
                .deliver(self.transport.delete_message(sent.channel, sent.message))
                .await
            {
                Ok(()) => deleted.push(sent.channel),
                Err(e) => {
                    debug!(%platform, stream = %stream_name, channel = %sent.channel, error = %e, "Failed to delete notification");
                }
            }
        }

        info!(%platform, stream = %stream_name, deleted = deleted.len(), "Stream went offline");

        self.events
            .publish(NotificationEvent::retract(platform, stream_name, deleted.clone()));

        deleted
    }

    /// Messages currently recorded for a stream.
    pub async fn sent_messages(&self, platform: Platform, key: &StreamKey) -> Vec<SentMessage> {
        self.sent
            .lock()
            .await
            .get(&(platform, key.clone()))
            .map(|record| record.messages.clone())
            .unwrap_or_default()
    }

    /// `(platform, key, stream name)` of every stream with a recorded
    /// notification.
    pub async fn recorded(&self) -> Vec<(Platform, StreamKey, String)> {
        self.sent
            .lock()
            .await
            .iter()
            .map(|((platform, key), record)| (*platform, key.clone(), record.stream.clone()))
            .collect()
    }
}
