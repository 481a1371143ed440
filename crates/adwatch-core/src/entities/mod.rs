//! Domain entities

mod channel;
mod news;
mod session;
mod subscription;

pub use channel::{Channel, ChannelUpsert};
pub use news::{ChannelNews, NewChannelNews};
pub use session::{SessionCredential, SessionLoad, SessionStatus, UserbotSession};
pub use subscription::{ChannelSubscription, SubscriptionWithChannel};
