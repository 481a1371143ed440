//! Channel entity - a Telegram channel monitored for advertising posts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Channel entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: i64,
    /// Absolute Telegram id, immutable once created
    pub telegram_id: i64,
    pub title: String,
    pub main_username: Option<String>,
    pub link_subscription: Option<String>,
    pub is_private: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Channel {
    /// Best-effort link for end-user notifications
    pub fn public_link(&self) -> String {
        if let Some(username) = self.main_username.as_deref().filter(|u| !u.is_empty()) {
            return format!("https://t.me/{username}");
        }
        if let Some(link) = self.link_subscription.as_deref().filter(|l| !l.is_empty()) {
            return link.to_string();
        }
        format!("https://t.me/c/{}", self.telegram_id)
    }

    /// Link a replacement session should join through
    pub fn join_link(&self) -> Option<String> {
        self.main_username
            .as_deref()
            .filter(|u| !u.is_empty())
            .map(|u| format!("https://t.me/{u}"))
            .or_else(|| self.link_subscription.clone().filter(|l| !l.is_empty()))
    }
}

/// Values written when a channel is joined or re-joined
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelUpsert {
    pub telegram_id: i64,
    pub title: String,
    pub username: Option<String>,
    pub link: String,
}

impl ChannelUpsert {
    pub fn new(telegram_id: i64, title: String, username: Option<String>, link: String) -> Self {
        Self {
            telegram_id: telegram_id.abs(),
            title,
            username: username.filter(|u| !u.is_empty()),
            link,
        }
    }

    /// Private iff no public username is present
    #[inline]
    pub fn is_private(&self) -> bool {
        self.username.is_none()
    }
}
