//! Bus message envelope.
//!
//! Every payload carries a `message_type` tag that selects the typed body.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tagged bus message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum BusMessage {
    SubscribeChannels(SubscribeRequest),
    SubscribeResponse(SubscribeResponse),
    NewAdMessage(NewAdMessage),
}

impl BusMessage {
    /// Tag value as written on the wire
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SubscribeChannels(_) => "subscribe_channels",
            Self::SubscribeResponse(_) => "subscribe_response",
            Self::NewAdMessage(_) => "new_ad_message",
        }
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a wire payload
    pub fn from_json(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}

/// Bot asks the fleet to join one or more channels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub request_id: String,
    pub user_id: i64,
    #[serde(default)]
    pub channel_links: Vec<String>,
}

impl SubscribeRequest {
    /// New request with a fresh correlation id
    #[must_use]
    pub fn new(user_id: i64, channel_links: Vec<String>) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            user_id,
            channel_links,
        }
    }
}

/// Outcome of joining one link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelResult {
    pub link: String,
    pub success: bool,
    #[serde(default)]
    pub telegram_id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl ChannelResult {
    #[must_use]
    pub fn joined(
        link: impl Into<String>,
        telegram_id: i64,
        title: impl Into<String>,
        username: Option<String>,
    ) -> Self {
        Self {
            link: link.into(),
            success: true,
            telegram_id: Some(telegram_id),
            title: Some(title.into()),
            username: username.filter(|u| !u.is_empty()),
            error_message: None,
        }
    }

    #[must_use]
    pub fn failed(link: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            success: false,
            telegram_id: None,
            title: None,
            username: None,
            error_message: Some(error.into()),
        }
    }
}

/// Fleet answer to exactly one `SubscribeRequest`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeResponse {
    pub request_id: String,
    pub user_id: i64,
    /// Session owning the first successful link, 0 when none
    #[serde(default)]
    pub userbot_id: i64,
    /// False only when the request could not be served at all
    pub success: bool,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub results: Vec<ChannelResult>,
}

impl SubscribeResponse {
    /// Response carrying per-link results
    #[must_use]
    pub fn completed(request: &SubscribeRequest, userbot_id: i64, results: Vec<ChannelResult>) -> Self {
        Self {
            request_id: request.request_id.clone(),
            user_id: request.user_id,
            userbot_id,
            success: true,
            error_message: None,
            results,
        }
    }

    /// Request-level failure; every link fails with the same message
    #[must_use]
    pub fn rejected(request: &SubscribeRequest, error: impl Into<String>) -> Self {
        let error = error.into();
        let results = request
            .channel_links
            .iter()
            .map(|link| ChannelResult::failed(link.as_str(), error.as_str()))
            .collect();
        Self {
            request_id: request.request_id.clone(),
            user_id: request.user_id,
            userbot_id: 0,
            success: false,
            error_message: Some(error),
            results,
        }
    }

    /// Links that were joined
    pub fn succeeded(&self) -> impl Iterator<Item = &ChannelResult> {
        self.results.iter().filter(|r| r.success)
    }
}

/// Fire-and-forget notification about a stored advertising post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAdMessage {
    /// Absolute Telegram channel id
    pub channel_id: i64,
    pub channel_title: String,
    pub channel_link: String,
    pub message_id: i64,
    pub message_text: String,
}
