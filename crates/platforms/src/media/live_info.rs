use serde::{Deserialize, Serialize};

use crate::platform::Platform;

/// Title used when a broadcaster left the stream title empty.
pub const UNTITLED_BROADCAST: &str = "Untitled broadcast";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
/// Details about a channel that is currently broadcasting.
///
/// This is what a status check hands back on a positive result and what
/// renderers turn into the human-facing notification.
///
/// # Examples
///
/// ```rust
/// use stream_platforms::media::LiveInfo;
/// use stream_platforms::Platform;
///
/// let info = LiveInfo::builder(Platform::Twitch, "Streamer", "https://www.twitch.tv/streamer")
///     .title("Speedrunning")
///     .game("Celeste")
///     .followers(1200)
///     .build();
/// assert_eq!(info.title, "Speedrunning");
/// ```
pub struct LiveInfo {
    pub platform: Platform,
    /// Display name of the broadcaster.
    pub display_name: String,
    pub title: String,
    /// Public channel page.
    pub url: String,
    pub avatar_url: Option<String>,
    pub followers: Option<u64>,
    pub total_views: Option<u64>,
    /// Stream preview image, already carrying a cache-busting query.
    pub preview_url: Option<String>,
    pub game: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LiveInfoBuilder {
    platform: Platform,
    display_name: String,
    title: Option<String>,
    url: String,
    avatar_url: Option<String>,
    followers: Option<u64>,
    total_views: Option<u64>,
    preview_url: Option<String>,
    game: Option<String>,
}

impl LiveInfo {
    pub fn builder(
        platform: Platform,
        display_name: impl Into<String>,
        url: impl Into<String>,
    ) -> LiveInfoBuilder {
        LiveInfoBuilder {
            platform,
            display_name: display_name.into(),
            title: None,
            url: url.into(),
            avatar_url: None,
            followers: None,
            total_views: None,
            preview_url: None,
            game: None,
        }
    }
}

impl LiveInfoBuilder {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn title_opt(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    pub fn avatar_url_opt(mut self, avatar_url: Option<String>) -> Self {
        self.avatar_url = avatar_url.filter(|u| !u.is_empty());
        self
    }

    pub fn followers(mut self, followers: u64) -> Self {
        self.followers = Some(followers);
        self
    }

    pub fn followers_opt(mut self, followers: Option<u64>) -> Self {
        self.followers = followers;
        self
    }

    pub fn total_views_opt(mut self, total_views: Option<u64>) -> Self {
        self.total_views = total_views;
        self
    }

    pub fn preview_url_opt(mut self, preview_url: Option<String>) -> Self {
        self.preview_url = preview_url.filter(|u| !u.is_empty());
        self
    }

    pub fn game(mut self, game: impl Into<String>) -> Self {
        self.game = Some(game.into());
        self
    }

    pub fn game_opt(mut self, game: Option<String>) -> Self {
        self.game = game.filter(|g| !g.is_empty());
        self
    }

    pub fn build(self) -> LiveInfo {
        let title = self
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| UNTITLED_BROADCAST.to_string());

        LiveInfo {
            platform: self.platform,
            display_name: self.display_name,
            title,
            url: self.url,
            avatar_url: self.avatar_url,
            followers: self.followers,
            total_views: self.total_views,
            preview_url: self.preview_url,
            game: self.game,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_title_falls_back() {
        let info = LiveInfo::builder(Platform::Mixer, "someone", "https://mixer.com/someone")
            .title("   ")
            .build();
        assert_eq!(info.title, UNTITLED_BROADCAST);

        let info = LiveInfo::builder(Platform::Mixer, "someone", "https://mixer.com/someone")
            .build();
        assert_eq!(info.title, UNTITLED_BROADCAST);
    }

    #[test]
    fn test_empty_optional_strings_are_dropped() {
        let info = LiveInfo::builder(Platform::Twitch, "a", "https://www.twitch.tv/a")
            .avatar_url_opt(Some(String::new()))
            .game_opt(Some(String::new()))
            .preview_url_opt(None)
            .build();
        assert!(info.avatar_url.is_none());
        assert!(info.game.is_none());
        assert!(info.preview_url.is_none());
    }
}
