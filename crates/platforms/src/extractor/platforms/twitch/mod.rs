mod builder;
mod models;

pub use builder::{DEFAULT_AVATAR, Twitch, URL_REGEX};
