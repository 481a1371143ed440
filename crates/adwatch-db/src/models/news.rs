//! Channel news database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for channel_news table
#[derive(Debug, Clone, FromRow)]
pub struct ChannelNewsModel {
    pub id: i64,
    pub channel_id: i64,
    pub message_id: i64,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
