pub mod live_info;
pub mod status;

pub use live_info::{LiveInfo, LiveInfoBuilder, UNTITLED_BROADCAST};
pub use status::{ResolvedChannel, StreamStatus};
