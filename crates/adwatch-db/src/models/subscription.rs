//! Subscription database models

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for channel_subscriptions table
#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionModel {
    pub id: i64,
    pub channel_id: i64,
    pub userbot_id: i64,
    pub is_subscribed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Subscription row joined with its channel
#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionWithChannelModel {
    pub id: i64,
    pub channel_id: i64,
    pub userbot_id: i64,
    pub is_subscribed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub telegram_id: i64,
    pub title: String,
    pub main_username: Option<String>,
    pub link_subscription: Option<String>,
    pub is_private: bool,
    pub channel_created_at: DateTime<Utc>,
    pub channel_updated_at: DateTime<Utc>,
}
