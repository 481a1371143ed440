//! Userbot database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for userbots table
#[derive(Debug, Clone, FromRow)]
pub struct SessionModel {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub api_id: i32,
    pub api_hash: String,
    pub session_file: Option<String>,
    pub string_session: Option<String>,
    /// 'inactive', 'authorizing', 'active' or 'error'
    pub status: String,
    pub is_active: bool,
    pub max_channels: i32,
    pub last_error: Option<String>,
    pub last_activity: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Userbot row with its subscribed-channel count
#[derive(Debug, Clone, FromRow)]
pub struct SessionLoadModel {
    #[sqlx(flatten)]
    pub session: SessionModel,
    pub subscribed: i64,
}
