//! Turning live stream details into chat messages.

use serde_json::{Value, json};
use stream_platforms::{LiveInfo, Platform};

use super::transport::RenderedNotification;
use crate::domain::MentionMode;

/// Builds the message posted when a stream goes live.
pub trait NotificationRenderer: Send + Sync {
    fn render(
        &self,
        platform: Platform,
        stream_name: &str,
        info: &LiveInfo,
        mention: MentionMode,
    ) -> RenderedNotification;
}

/// Plain "is live" text plus a Discord embed.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRenderer;

impl DefaultRenderer {
    /// Brand colour of the platform's embeds.
    fn color(platform: Platform) -> u32 {
        match platform {
            Platform::Twitch => 0x6441A4,
            Platform::Mixer => 0x4C90F3,
        }
    }

    pub fn content(stream_name: &str, mention: MentionMode) -> String {
        match mention.prefix() {
            "" => format!("{stream_name} is live!"),
            prefix => format!("{prefix} {stream_name} is live!"),
        }
    }

    pub fn embed(info: &LiveInfo) -> Value {
        let count = |value: Option<u64>| value.map_or_else(|| "-".to_string(), |v| v.to_string());

        let mut embed = json!({
            "title": info.title,
            "url": info.url,
            "color": Self::color(info.platform),
            "author": { "name": info.display_name },
            "fields": [
                { "name": "Followers", "value": count(info.followers), "inline": true },
                { "name": "Total views", "value": count(info.total_views), "inline": true },
            ],
        });

        if let Some(avatar) = &info.avatar_url {
            embed["thumbnail"] = json!({ "url": avatar });
        }
        if let Some(preview) = &info.preview_url {
            embed["image"] = json!({ "url": preview });
        }
        if let Some(game) = &info.game {
            embed["footer"] = json!({ "text": format!("Playing: {game}") });
        }

        embed
    }
}

impl NotificationRenderer for DefaultRenderer {
    fn render(
        &self,
        _platform: Platform,
        stream_name: &str,
        info: &LiveInfo,
        mention: MentionMode,
    ) -> RenderedNotification {
        RenderedNotification {
            content: Self::content(stream_name, mention),
            embed: Some(Self::embed(info)),
        }
    }
}
