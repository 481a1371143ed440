//! Ports implemented by the infrastructure crates

mod repositories;
mod telegram;

pub use repositories::{
    ChannelRepository, InsertOutcome, NewsRepository, RepoResult, SessionRepository,
    SubscriptionRepository,
};
pub use telegram::{
    AccountInfo, ChannelInfo, ClientError, ClientFactory, ClientResult, IncomingMessage,
    InviteCheck, UserClient, BAN_RPC_ERRORS,
};
