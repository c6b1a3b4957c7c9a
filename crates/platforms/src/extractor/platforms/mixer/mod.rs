mod builder;
mod models;

pub use builder::{DEFAULT_AVATAR, Mixer, URL_REGEX};
