//! Live notifications: rendering, delivery, retraction and event fan-out.

pub mod discord;
pub mod events;
pub mod manager;
pub mod renderer;
pub mod transport;

pub use discord::DiscordTransport;
pub use events::{NotificationEvent, NotificationEventBroadcaster, NotificationKind};
pub use manager::{NotificationManager, SentMessage};
pub use renderer::{DefaultRenderer, NotificationRenderer};
pub use transport::{ChannelInfo, MessageTransport, RenderedNotification};
