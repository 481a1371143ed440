//! Subscription entity - which session owns a channel's membership

use chrono::{DateTime, Utc};

use super::Channel;

/// Ownership edge between a session and a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSubscription {
    pub id: i64,
    pub channel_id: i64,
    pub session_id: i64,
    pub is_subscribed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Subscription joined with its channel, as loaded for migration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionWithChannel {
    pub subscription: ChannelSubscription,
    pub channel: Channel,
}
