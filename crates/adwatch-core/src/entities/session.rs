//! Userbot session entity - a Telegram user account driven by the fleet

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of channels a single account may own
pub const DEFAULT_MAX_CHANNELS: i32 = 500;

/// Lifecycle status persisted for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Inactive,
    Authorizing,
    Active,
    Error,
}

impl SessionStatus {
    /// Database representation
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Authorizing => "authorizing",
            Self::Active => "active",
            Self::Error => "error",
        }
    }

    /// Parse the database representation, falling back to `Inactive`
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "authorizing" => Self::Authorizing,
            "active" => Self::Active,
            "error" => Self::Error,
            _ => Self::Inactive,
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted credential; exactly one form is authoritative per session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCredential {
    /// Portable session string
    StringSession(String),
    /// Path to a local session file
    File(PathBuf),
}

impl SessionCredential {
    /// Resolve the authoritative credential from the stored columns.
    ///
    /// A non-empty string session wins; otherwise the stored file path is used,
    /// or the conventional `{sessions_dir}/{id}_{phone digits}.session` path.
    pub fn resolve(
        string_session: Option<&str>,
        session_file: Option<&str>,
        sessions_dir: &Path,
        id: i64,
        phone: &str,
    ) -> Self {
        if let Some(s) = string_session.map(str::trim).filter(|s| !s.is_empty()) {
            return Self::StringSession(s.to_string());
        }
        match session_file.map(str::trim).filter(|s| !s.is_empty()) {
            Some(path) => Self::File(PathBuf::from(path)),
            None => Self::File(default_session_path(sessions_dir, id, phone)),
        }
    }

    #[must_use]
    pub fn is_string_session(&self) -> bool {
        matches!(self, Self::StringSession(_))
    }
}

/// Conventional session file location for an account
pub fn default_session_path(sessions_dir: &Path, id: i64, phone: &str) -> PathBuf {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    sessions_dir.join(format!("{id}_{digits}.session"))
}

/// Userbot session entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserbotSession {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub api_id: i32,
    pub api_hash: String,
    pub credential: SessionCredential,
    pub status: SessionStatus,
    pub is_active: bool,
    pub max_channels: i32,
    pub last_error: Option<String>,
    pub last_activity: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserbotSession {
    /// Whether the session may take on new work
    #[inline]
    pub fn is_eligible(&self) -> bool {
        self.status == SessionStatus::Active && self.is_active
    }

    /// Whether the session can own one more channel
    #[inline]
    pub fn has_capacity(&self, subscribed: i64) -> bool {
        subscribed < i64::from(self.max_channels)
    }

    /// Name used in logs
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.phone
        } else {
            &self.name
        }
    }
}

/// A session together with the number of channels it currently owns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLoad {
    pub session: UserbotSession,
    pub subscribed: i64,
}

impl SessionLoad {
    #[inline]
    pub fn has_capacity(&self) -> bool {
        self.session.has_capacity(self.subscribed)
    }
}
