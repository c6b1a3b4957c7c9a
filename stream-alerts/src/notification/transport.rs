//! Delivery seam between the notifier and the chat service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;
use crate::domain::{ChannelId, GuildId, MessageId};

/// What the transport knows about a destination channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelInfo {
    pub guild: GuildId,
    /// Whether the bot may post in the channel.
    pub can_send: bool,
}

/// A message ready for delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedNotification {
    pub content: String,
    /// Rich embed payload in the chat service's format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed: Option<Value>,
}

/// Chat service operations the notifier relies on.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Look up a channel; `None` when it no longer exists or is not visible.
    async fn channel_info(&self, channel: ChannelId) -> Result<Option<ChannelInfo>>;

    async fn send_message(
        &self,
        channel: ChannelId,
        message: &RenderedNotification,
    ) -> Result<MessageId>;

    async fn delete_message(&self, channel: ChannelId, message: MessageId) -> Result<()>;
}
