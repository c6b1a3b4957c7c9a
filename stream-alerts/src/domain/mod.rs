//! Domain types shared by the store, the notifier and the scheduler.

pub mod ids;
pub mod settings;
pub mod stream;

pub use ids::{ChannelId, GuildId, MessageId};
pub use settings::{Credentials, GuildSettings, MentionMode, Settings};
pub use stream::{StreamKey, TrackedStream};
