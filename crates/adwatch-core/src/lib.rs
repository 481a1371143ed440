//! # adwatch-core
//!
//! Domain layer containing entities, value objects, repository traits, the Telegram
//! client port and the advertisement classifier.
//! This crate has zero dependencies on infrastructure (database, Redis, MTProto).

pub mod classifier;
pub mod entities;
pub mod error;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use classifier::{is_advertisement, min_matches_for_length, REQUIRED_MARKERS};
pub use entities::{
    Channel, ChannelNews, ChannelSubscription, ChannelUpsert, NewChannelNews, SessionCredential,
    SessionLoad, SessionStatus, SubscriptionWithChannel, UserbotSession,
};
pub use error::DomainError;
pub use traits::{
    AccountInfo, ChannelInfo, ChannelRepository, ClientError, ClientFactory, ClientResult,
    IncomingMessage, InsertOutcome, InviteCheck, NewsRepository, RepoResult, SessionRepository,
    SubscriptionRepository, UserClient,
};
pub use value_objects::{parse_channel_links, ChannelLink};
