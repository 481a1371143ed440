//! Database models - SQLx-compatible structs for PostgreSQL tables

mod channel;
mod news;
mod session;
mod subscription;

pub use channel::ChannelModel;
pub use news::ChannelNewsModel;
pub use session::{SessionLoadModel, SessionModel};
pub use subscription::{SubscriptionModel, SubscriptionWithChannelModel};
