//! Telegram client port
//!
//! The fleet never sees raw transport errors. Adapters translate them once into
//! [`ClientError`], so ban handling is a match on a closed enum.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::entities::UserbotSession;

/// RPC error names that mean the account is gone for good
pub const BAN_RPC_ERRORS: &[&str] = &[
    "AUTH_KEY_UNREGISTERED",
    "SESSION_REVOKED",
    "USER_DEACTIVATED",
    "USER_DEACTIVATED_BAN",
];

const NOT_AUTHORIZED_RPC_ERRORS: &[&str] =
    &["AUTH_KEY_INVALID", "SESSION_EXPIRED", "SESSION_PASSWORD_NEEDED"];

/// Closed set of client failure kinds
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// Credentials were revoked; non-retryable for this session
    #[error("Session banned: {0}")]
    Banned(String),

    /// The session exists but needs operator re-authorization
    #[error("Session is not authorized")]
    NotAuthorized,

    /// The account is already a member; callers recover identity with a lookup
    #[error("Already a participant")]
    AlreadyParticipant,

    #[error("Invalid channel link: {0}")]
    InvalidLink(String),

    /// Network or protocol failure; the caller may retry
    #[error("{0}")]
    Transient(String),
}

impl ClientError {
    /// Classify a raw RPC error by name
    pub fn from_rpc_name(name: &str, detail: impl fmt::Display) -> Self {
        if BAN_RPC_ERRORS.contains(&name) {
            Self::Banned(name.to_string())
        } else if name == "USER_ALREADY_PARTICIPANT" {
            Self::AlreadyParticipant
        } else if NOT_AUTHORIZED_RPC_ERRORS.contains(&name) {
            Self::NotAuthorized
        } else {
            Self::Transient(detail.to_string())
        }
    }

    pub fn transient(detail: impl fmt::Display) -> Self {
        Self::Transient(detail.to_string())
    }

    #[inline]
    pub fn is_ban(&self) -> bool {
        matches!(self, Self::Banned(_))
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Identity of a joined or resolved channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub telegram_id: i64,
    pub title: String,
    pub username: Option<String>,
}

/// Result of inspecting an invite hash without joining
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InviteCheck {
    /// The account already belongs to the chat
    Member(ChannelInfo),
    /// A valid invite the account has not used yet
    NotMember { title: String },
}

/// Logged-in account, as reported by the heartbeat
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub user_id: i64,
    pub display_name: String,
    pub username: Option<String>,
}

/// A new post observed in a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    /// Chat id as delivered by the transport; may be negative
    pub chat_id: i64,
    pub message_id: i64,
    pub text: String,
    pub date: DateTime<Utc>,
}

/// A connected, authorized user-session client
#[async_trait]
pub trait UserClient: Send + Sync {
    /// Whether the transport currently reports a live connection
    fn is_connected(&self) -> bool;

    /// Re-establish the connection after a drop
    async fn reconnect(&self) -> ClientResult<()>;

    /// Fetch the logged-in account; used as a liveness ping
    async fn me(&self) -> ClientResult<AccountInfo>;

    /// Look up a public channel by handle without joining
    async fn resolve_public(&self, handle: &str) -> ClientResult<ChannelInfo>;

    /// Resolve and join a public channel
    async fn join_public(&self, handle: &str) -> ClientResult<ChannelInfo>;

    /// Join through an invite hash
    async fn import_invite(&self, hash: &str) -> ClientResult<ChannelInfo>;

    /// Inspect an invite hash
    async fn check_invite(&self, hash: &str) -> ClientResult<InviteCheck>;

    /// Drive the update loop until disconnect, forwarding channel posts to `sink`.
    ///
    /// Returns `Ok(())` on a clean disconnect and the classified error otherwise.
    async fn run(&self, sink: mpsc::Sender<IncomingMessage>) -> ClientResult<()>;

    /// Close the connection
    async fn disconnect(&self);
}

/// Creates clients from persisted credentials
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// Restore credentials, connect and verify authorization.
    ///
    /// An unauthorized session yields `ClientError::NotAuthorized`, distinct from a ban.
    async fn create(&self, session: &UserbotSession) -> ClientResult<Arc<dyn UserClient>>;
}
