//! Value objects

mod channel_link;

pub use channel_link::{parse_channel_links, ChannelLink};
