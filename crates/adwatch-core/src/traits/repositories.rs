//! Repository traits (ports) - define the interface for data access
//!
//! The store is the single source of truth and is written concurrently by every
//! session task, so every mutating call here is upsert-shaped: implementations
//! make each call atomic instead of leaving read-modify-write races to callers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{
    Channel, ChannelNews, ChannelSubscription, ChannelUpsert, NewChannelNews, SessionLoad,
    SessionStatus, SubscriptionWithChannel, UserbotSession,
};
use crate::error::DomainError;

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// Session Repository
// ============================================================================

#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Find session by ID
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<UserbotSession>>;

    /// List every stored session
    async fn find_all(&self) -> RepoResult<Vec<UserbotSession>>;

    /// Sessions with status=active and is_active=true
    async fn find_eligible(&self) -> RepoResult<Vec<UserbotSession>>;

    /// Eligible sessions with their current subscribed-channel counts
    async fn find_eligible_with_load(&self) -> RepoResult<Vec<SessionLoad>>;

    /// Set lifecycle status and last error text
    async fn update_status(
        &self,
        id: i64,
        status: SessionStatus,
        last_error: Option<&str>,
    ) -> RepoResult<()>;

    /// Soft-retire a session: status=error, is_active=false, reason recorded
    async fn deactivate(&self, id: i64, reason: &str) -> RepoResult<()>;

    /// Record the last observed sign of life
    async fn touch_activity(&self, id: i64, at: DateTime<Utc>) -> RepoResult<()>;
}

// ============================================================================
// Channel Repository
// ============================================================================

#[async_trait]
pub trait ChannelRepository: Send + Sync {
    /// Find channel by its (absolute) Telegram id
    async fn find_by_telegram_id(&self, telegram_id: i64) -> RepoResult<Option<Channel>>;

    /// Insert or update by Telegram id; title, username, link and privacy are refreshed
    async fn upsert(&self, channel: &ChannelUpsert) -> RepoResult<Channel>;
}

// ============================================================================
// Subscription Repository
// ============================================================================

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Make `session_id` the single owner of `channel_id`.
    ///
    /// Upserts the (channel, session) row with `is_subscribed = true` and flips every
    /// other row of the channel to false, atomically.
    async fn claim(&self, channel_id: i64, session_id: i64) -> RepoResult<ChannelSubscription>;

    /// Flip the (channel, session) row to not-subscribed
    async fn release(&self, channel_id: i64, session_id: i64) -> RepoResult<()>;

    /// Subscriptions a session currently owns, with their channels
    async fn find_subscribed_by_session(
        &self,
        session_id: i64,
    ) -> RepoResult<Vec<SubscriptionWithChannel>>;

    /// Every row for a channel, subscribed or not
    async fn find_by_channel(&self, channel_id: i64) -> RepoResult<Vec<ChannelSubscription>>;
}

// ============================================================================
// News Repository
// ============================================================================

/// Outcome of inserting an ingested post
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(ChannelNews),
    /// `(channel, message_id)` already stored
    Duplicate,
}

#[async_trait]
pub trait NewsRepository: Send + Sync {
    /// Insert a post; a unique-key conflict is reported as `Duplicate`
    async fn insert(&self, news: &NewChannelNews) -> RepoResult<InsertOutcome>;
}
