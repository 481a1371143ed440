//! Ingested channel posts

use chrono::{DateTime, Utc};

/// A stored advertising post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelNews {
    pub id: i64,
    pub channel_id: i64,
    pub message_id: i64,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload; `(channel_id, message_id)` is unique
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChannelNews {
    pub channel_id: i64,
    pub message_id: i64,
    pub message: String,
}
